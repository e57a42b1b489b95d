//! Ordered fallback loading.
//!
//! A load that can be answered by more than one source (fresh fetch, cached
//! snapshot, secondary store) is expressed as a chain of named strategies
//! tried in order. The first success wins; the total number of attempts is
//! bounded; if everything fails the caller gets one aggregated error naming
//! every attempt instead of a cascade of partial failures.

use std::future::Future;

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};

use crate::errors::SyncError;

type BoxedStrategy<'a, T> = BoxFuture<'a, Result<T>>;

pub struct LoadChain<'a, T> {
    label: &'static str,
    max_attempts: usize,
    strategies: Vec<(&'static str, BoxedStrategy<'a, T>)>,
}

/// Outcome of a chain run: the value plus the index of the strategy that
/// produced it, so the caller can tell a fresh result from a fallback, and
/// the failures of the strategies that were tried first.
#[derive(Debug)]
pub struct LoadOutcome<T> {
    pub value: T,
    pub strategy_index: usize,
    pub strategy_name: &'static str,
    pub failures: Vec<String>,
}

impl<'a, T> LoadChain<'a, T> {
    pub fn new(label: &'static str, max_attempts: usize) -> Self {
        Self {
            label,
            max_attempts,
            strategies: Vec::new(),
        }
    }

    pub fn push<F>(mut self, name: &'static str, strategy: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'a,
    {
        self.strategies.push((name, strategy.boxed()));
        self
    }

    pub async fn run(self) -> Result<LoadOutcome<T>, SyncError> {
        let mut failures: Vec<String> = Vec::new();
        let mut attempts = 0usize;

        for (index, (name, strategy)) in self.strategies.into_iter().enumerate() {
            if attempts >= self.max_attempts {
                failures.push(format!("{name}: not attempted (attempt cap reached)"));
                continue;
            }
            attempts += 1;
            match strategy.await {
                Ok(value) => {
                    if index > 0 {
                        tracing::warn!(
                            chain = self.label,
                            strategy = name,
                            "load degraded to fallback strategy"
                        );
                    }
                    return Ok(LoadOutcome {
                        value,
                        strategy_index: index,
                        strategy_name: name,
                        failures,
                    });
                }
                Err(err) => {
                    tracing::debug!(chain = self.label, strategy = name, error = %err, "load strategy failed");
                    failures.push(format!("{name}: {err}"));
                }
            }
        }

        Err(SyncError::StrategiesExhausted {
            attempts,
            details: format!("{} [{}]", self.label, failures.join("; ")),
        })
    }
}

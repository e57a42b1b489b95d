use thiserror::Error;

/// Failures the engine surfaces to its callers.
///
/// Duplicate push delivery is deliberately absent: redelivered events are
/// absorbed by the idempotent merge functions and never become an error.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A read failed; the caller was handed the last known-good cached state
    /// and may retry manually. Non-blocking.
    #[error("fetch failed, showing cached data: {0}")]
    TransientFetch(String),

    /// A write was rejected; the optimistic change has been rolled back to
    /// the exact pre-mutation snapshot. Blocking, names the failed action.
    #[error("{action} was rejected: {reason}")]
    MutationRejected { action: &'static str, reason: String },

    /// Every strategy in an ordered load chain failed (or the attempt cap was
    /// reached). Carries one aggregated description of all attempts.
    #[error("all load strategies failed after {attempts} attempt(s): {details}")]
    StrategiesExhausted { attempts: usize, details: String },

    /// The push subscription's event stream closed. No state is rolled back;
    /// events simply stop until resubscription succeeds.
    #[error("push subscription dropped for {topic}")]
    SubscriptionDropped { topic: String },
}

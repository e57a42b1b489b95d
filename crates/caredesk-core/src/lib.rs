//! Client-side synchronization engine for notifications and direct
//! conversations: optimistic mutations with rollback, idempotent push-event
//! merges, generation-tagged subscriptions, and derived unread counters.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod models;
pub mod reconcile;
pub mod runtime;
pub mod store;
pub mod strategy;
pub mod subscription;
pub mod tracing_setup;

#[cfg(test)]
pub(crate) mod testing;

// Re-export the engine surface at crate root for convenience
pub use config::EngineConfig;
pub use errors::SyncError;
pub use runtime::SyncEngine;
pub use store::Counters;

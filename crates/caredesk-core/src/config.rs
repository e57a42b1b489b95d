use crate::constants;

/// Tunables for the synchronization engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Most-recent notifications kept in memory after a load.
    pub notification_window: usize,
    /// Total attempts across the ordered load-strategy chain.
    pub load_attempts: usize,
    /// Resubscribe attempts per pump after a dropped push subscription.
    pub resubscribe_attempts: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            notification_window: constants::DEFAULT_NOTIFICATION_WINDOW,
            load_attempts: constants::DEFAULT_LOAD_ATTEMPTS,
            resubscribe_attempts: constants::DEFAULT_RESUBSCRIBE_ATTEMPTS,
        }
    }
}

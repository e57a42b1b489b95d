use serde::{Deserialize, Serialize};

/// A single chat message.
///
/// `read` is monotonic: once true it never flips back, regardless of what a
/// late or duplicated push event claims (see `reconcile::merge_message`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    /// Unix seconds.
    pub created_at: u64,
    pub read: bool,
}

impl Message {
    /// Whether this is an optimistic local message still awaiting its
    /// canonical id from the gateway.
    pub fn is_pending(&self) -> bool {
        self.id.starts_with(crate::constants::PENDING_ID_PREFIX)
    }

    /// Mint a temporary id for an optimistic message.
    pub fn pending_id() -> String {
        format!(
            "{}{}",
            crate::constants::PENDING_ID_PREFIX,
            uuid::Uuid::new_v4()
        )
    }
}

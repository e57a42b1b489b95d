use serde::{Deserialize, Serialize};

/// The counterpart in a two-party conversation, resolved from a profile
/// lookup at list-load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub role: String,
}

impl Participant {
    /// Degraded identity used when the profile lookup fails; the conversation
    /// list must render even when a profile row is missing or unreachable.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: crate::constants::PLACEHOLDER_DISPLAY_NAME.to_string(),
            avatar_ref: None,
            role: String::new(),
        }
    }
}

/// Preview of the newest message seen so far for a conversation.
///
/// `timestamp` is monotonic: a message delivered late with an earlier
/// timestamp never overwrites a newer preview, and a redelivery of the
/// message the preview already shows (same id, same timestamp) is a no-op
/// (see `reconcile::advance_last_message`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    /// Id of the message this preview was taken from. `None` only for
    /// persisted rows that predate preview tracking.
    pub message_id: Option<String>,
    pub content: String,
    /// Unix seconds.
    pub timestamp: u64,
    pub unread_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub other_participant: Participant,
    pub last_message: LastMessage,
}

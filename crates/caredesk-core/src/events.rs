use serde::{Deserialize, Serialize};

use crate::models::{Message, NotificationRecord};

/// Whether the pushed row is new or a mutation of a known row. The merge
/// functions treat both as upserts, so a channel that mislabels a redelivery
/// cannot corrupt state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "payload", rename_all = "snake_case")]
pub enum ChangePayload {
    Message(Message),
    Notification(NotificationRecord),
}

/// One change pushed by the push channel. Delivery is at-least-once and
/// unordered across reconnects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(flatten)]
    pub payload: ChangePayload,
}

/// A change event stamped with the subscription generation it was read from.
/// Events whose generation no longer matches the manager's current one are
/// stale (the subscription was swapped while they were in flight) and must be
/// discarded, not merged.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: ChangeEvent,
}

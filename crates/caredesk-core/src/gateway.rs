//! External collaborator seams.
//!
//! The persistence API and the push channel are not part of the engine; they
//! are consumed through these traits so the stores can be exercised against
//! in-memory doubles. Gateway methods return `anyhow::Result` — the engine
//! maps failures into its own `SyncError` taxonomy at the call site.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::events::ChangeEvent;
use crate::models::{LastMessage, Message, NotificationRecord, Participant};

/// Raw conversation row as persisted. The other participant is an id here;
/// `ConversationIndex::load_conversations` resolves it to a `Participant`
/// via `fetch_profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRow {
    pub id: String,
    pub other_participant_id: String,
    pub last_message: LastMessage,
}

/// Request/response persistence API for notification and message rows.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn list_notifications(&self, owner_id: &str) -> Result<Vec<NotificationRecord>>;

    async fn update_notification_read(&self, id: &str, read: bool) -> Result<()>;

    /// Batch form used by mark-all-read; one round trip for the whole set.
    async fn mark_notifications_read(&self, ids: &[String]) -> Result<()>;

    async fn delete_notification(&self, id: &str) -> Result<()>;

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<ConversationRow>>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Participant>;

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Returns the canonical row for the inserted message; the caller
    /// reconciles its optimistic temporary id against it.
    async fn insert_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
    ) -> Result<Message>;

    async fn mark_messages_read(&self, conversation_id: &str, reader_id: &str) -> Result<()>;
}

/// subscribe(topic) -> stream of change events. At-least-once delivery, no
/// ordering guarantee across reconnects.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<PushSubscription>;
}

/// A live subscription: an event receiver plus a teardown guard. Dropping it
/// unsubscribes, so a subscription can never outlive its owner.
pub struct PushSubscription {
    topic: String,
    events: UnboundedReceiver<ChangeEvent>,
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl PushSubscription {
    pub fn new(
        topic: impl Into<String>,
        events: UnboundedReceiver<ChangeEvent>,
        teardown: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            topic: topic.into(),
            events,
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Non-blocking poll. `Ok(None)` means no event is queued right now;
    /// `Err(())` means the channel closed (subscription dropped).
    pub fn try_next(&mut self) -> Result<Option<ChangeEvent>, ()> {
        use tokio::sync::mpsc::error::TryRecvError;
        match self.events.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(()),
        }
    }

    pub fn unsubscribe(self) {
        // Drop runs the teardown.
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

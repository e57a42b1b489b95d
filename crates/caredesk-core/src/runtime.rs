//! Engine composition: one logical event loop per client.
//!
//! UI actions call the async methods (optimistic apply + gateway dispatch,
//! confirm or rollback inside); push-channel events are drained through
//! `pump()`, filtered by subscription generation, and merged through the
//! shared reconciliation rules. After any of these, callers re-derive badges
//! from `counters()` — no surface keeps a private count.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::constants::notification_topic;
use crate::errors::SyncError;
use crate::events::{ChangeEvent, ChangePayload, TaggedEvent};
use crate::gateway::{PersistenceGateway, PushChannel, PushSubscription};
use crate::models::{ConversationSummary, Message, NotificationRecord};
use crate::store::{ConversationIndex, Counters, NotificationStore};
use crate::subscription::{Poll, SubscriptionManager};

pub struct SyncEngine {
    config: EngineConfig,
    channel: Arc<dyn PushChannel>,
    notifications: NotificationStore,
    conversations: ConversationIndex,
    subscriptions: SubscriptionManager,
    /// Session-lifetime subscription for notification events.
    notification_sub: Option<PushSubscription>,
    /// Conversation the user wants live events for; retried by `pump()` when
    /// the subscription is down.
    wanted_conversation: Option<String>,
    owner_id: Option<String>,
}

impl SyncEngine {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        channel: Arc<dyn PushChannel>,
        config: EngineConfig,
    ) -> Self {
        Self {
            notifications: NotificationStore::new(gateway.clone(), &config),
            conversations: ConversationIndex::new(gateway),
            subscriptions: SubscriptionManager::new(channel.clone()),
            channel,
            config,
            notification_sub: None,
            wanted_conversation: None,
            owner_id: None,
        }
    }

    // ===== UI surfaces =====

    pub fn notifications(&self) -> &[NotificationRecord] {
        self.notifications.notifications()
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        self.conversations.conversations()
    }

    pub fn open_conversation_messages(&self) -> &[Message] {
        self.conversations.open_messages()
    }

    /// Every badge value, derived from the canonical sets.
    pub fn counters(&self) -> Counters {
        Counters::derive(
            self.notifications.notifications(),
            self.conversations.conversations(),
        )
    }

    // ===== Session lifecycle =====

    /// Populate both stores for `owner_id` and open the session-lifetime
    /// notification subscription. Returns a non-blocking warning when the
    /// notification load degraded to cached state.
    pub async fn start_session(&mut self, owner_id: &str) -> Result<Option<SyncError>, SyncError> {
        let warning = self.notifications.load(owner_id).await?;
        self.notifications.synthesize_welcome_if_absent();
        self.conversations.load_conversations(owner_id).await?;
        self.owner_id = Some(owner_id.to_string());

        let topic = notification_topic(owner_id);
        match self.channel.subscribe(&topic).await {
            Ok(sub) => self.notification_sub = Some(sub),
            Err(err) => {
                tracing::warn!(%topic, error = %err, "notification subscribe failed; will retry on pump");
            }
        }
        Ok(warning)
    }

    /// Discard all session state.
    pub fn logout(&mut self) {
        self.notifications.clear();
        self.conversations.clear();
        self.subscriptions.close();
        self.notification_sub = None;
        self.wanted_conversation = None;
        self.owner_id = None;
    }

    // ===== Notification actions =====

    pub async fn mark_notification_read(&mut self, id: &str, read: bool) -> Result<(), SyncError> {
        self.notifications.mark_read(id, read).await
    }

    pub async fn mark_all_notifications_read(&mut self) -> Result<(), SyncError> {
        self.notifications.mark_all_read().await
    }

    pub fn delete_notification(&mut self, id: &str) {
        self.notifications.delete(id);
    }

    // ===== Conversation actions =====

    /// Open a conversation: load and mark its log, then swap the live push
    /// subscription over to it. A subscribe failure is not surfaced — the
    /// view renders from last confirmed state and `pump()` silently retries.
    pub async fn select_conversation(&mut self, conversation_id: &str) -> Result<(), SyncError> {
        self.conversations.select_conversation(conversation_id).await?;
        self.wanted_conversation = Some(conversation_id.to_string());
        if let Err(err) = self.subscriptions.open(conversation_id).await {
            tracing::warn!(conversation = conversation_id, error = %err, "live subscription unavailable");
        }
        Ok(())
    }

    pub fn close_conversation(&mut self) {
        self.conversations.close_conversation();
        self.subscriptions.close();
        self.wanted_conversation = None;
    }

    pub async fn send_message(
        &mut self,
        conversation_id: &str,
        recipient_id: &str,
        content: &str,
    ) -> Result<(), SyncError> {
        let Some(sender_id) = self.owner_id.clone() else {
            return Err(SyncError::MutationRejected {
                action: "send message",
                reason: "no active session".to_string(),
            });
        };
        self.conversations
            .send_message(conversation_id, &sender_id, recipient_id, content)
            .await
    }

    // ===== Push event intake =====

    /// Merge one tagged event, unless its generation is stale. Returns
    /// whether it was applied.
    pub fn apply_tagged(&mut self, tagged: TaggedEvent) -> bool {
        if !self.subscriptions.is_current(&tagged) {
            tracing::debug!(
                generation = tagged.generation,
                current = self.subscriptions.current_generation(),
                "discarding stale push event"
            );
            return false;
        }
        self.apply_event(tagged.event);
        true
    }

    fn apply_event(&mut self, event: ChangeEvent) {
        match event.payload {
            ChangePayload::Message(message) => self.conversations.apply_incoming_message(message),
            ChangePayload::Notification(record) => self.notifications.apply_remote(record),
        }
    }

    /// Drain every queued push event through the generation filter and the
    /// idempotent merges, then silently retry any dropped subscription.
    /// Returns how many events were applied.
    pub async fn pump(&mut self) -> usize {
        let mut applied = 0;

        // Conversation events.
        loop {
            match self.subscriptions.poll() {
                Poll::Event(tagged) => {
                    if self.apply_tagged(tagged) {
                        applied += 1;
                    }
                }
                Poll::Idle => break,
                Poll::Dropped { conversation_id } => {
                    self.wanted_conversation = Some(conversation_id);
                    break;
                }
            }
        }

        // Notification events.
        let mut notification_dropped = false;
        if let Some(sub) = self.notification_sub.as_mut() {
            loop {
                match sub.try_next() {
                    Ok(Some(event)) => {
                        applied += 1;
                        match event.payload {
                            ChangePayload::Notification(record) => {
                                self.notifications.apply_remote(record);
                            }
                            ChangePayload::Message(message) => {
                                self.conversations.apply_incoming_message(message);
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(()) => {
                        notification_dropped = true;
                        break;
                    }
                }
            }
        }
        if notification_dropped {
            self.notification_sub = None;
        }

        self.resubscribe_if_needed().await;
        applied
    }

    async fn resubscribe_if_needed(&mut self) {
        if self.subscriptions.subscribed_conversation().is_none() {
            if let Some(wanted) = self.wanted_conversation.clone() {
                for _ in 0..self.config.resubscribe_attempts {
                    if self.subscriptions.open(&wanted).await.is_ok() {
                        break;
                    }
                }
            }
        }
        if self.notification_sub.is_none() {
            if let Some(owner_id) = self.owner_id.clone() {
                let topic = notification_topic(&owner_id);
                for _ in 0..self.config.resubscribe_attempts {
                    match self.channel.subscribe(&topic).await {
                        Ok(sub) => {
                            self.notification_sub = Some(sub);
                            break;
                        }
                        Err(err) => {
                            tracing::debug!(%topic, error = %err, "notification resubscribe failed");
                        }
                    }
                }
            }
        }
    }
}

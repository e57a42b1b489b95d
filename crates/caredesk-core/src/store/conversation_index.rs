use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::SyncError;
use crate::gateway::PersistenceGateway;
use crate::models::{ConversationSummary, LastMessage, Message, Participant};
use crate::reconcile::{advance_last_message, merge_message, resolve_pending_message, Snapshot};
use crate::store::counters::unread_message_count;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The message log of the one conversation currently open. All other
/// conversations hold only their summary, which keeps memory bounded.
struct OpenConversation {
    id: String,
    messages: Vec<Message>,
}

/// Canonical in-memory model of conversation summaries plus the open
/// conversation's message log.
pub struct ConversationIndex {
    gateway: Arc<dyn PersistenceGateway>,
    owner_id: Option<String>,
    conversations: Vec<ConversationSummary>,
    open: Option<OpenConversation>,
}

impl ConversationIndex {
    pub fn new(gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            gateway,
            owner_id: None,
            conversations: Vec::new(),
            open: None,
        }
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn open_conversation_id(&self) -> Option<&str> {
        self.open.as_ref().map(|o| o.id.as_str())
    }

    pub fn open_messages(&self) -> &[Message] {
        self.open.as_ref().map(|o| o.messages.as_slice()).unwrap_or(&[])
    }

    pub fn unread_count(&self) -> usize {
        unread_message_count(&self.conversations)
    }

    /// Discard all state (logout).
    pub fn clear(&mut self) {
        self.owner_id = None;
        self.conversations.clear();
        self.open = None;
    }

    /// Load the conversation list, resolving each counterpart's identity via
    /// a profile lookup. A failed lookup degrades that one summary to a
    /// placeholder identity instead of failing the whole list.
    pub async fn load_conversations(&mut self, owner_id: &str) -> Result<(), SyncError> {
        let rows = self
            .gateway
            .list_conversations(owner_id)
            .await
            .map_err(|err| SyncError::TransientFetch(err.to_string()))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let other_participant = match self.gateway.fetch_profile(&row.other_participant_id).await
            {
                Ok(participant) => participant,
                Err(err) => {
                    tracing::warn!(
                        participant = %row.other_participant_id,
                        error = %err,
                        "profile lookup failed, using placeholder identity"
                    );
                    Participant::placeholder(&row.other_participant_id)
                }
            };
            summaries.push(ConversationSummary {
                id: row.id,
                other_participant,
                last_message: row.last_message,
            });
        }
        summaries.sort_by(|a, b| b.last_message.timestamp.cmp(&a.last_message.timestamp));

        self.owner_id = Some(owner_id.to_string());
        self.conversations = summaries;
        Ok(())
    }

    /// Open a conversation: load its log (evicting the previously open one),
    /// then optimistically mark every message addressed to the current user
    /// as read and dispatch the batch mark-read call. Rejection rolls the
    /// read flags back but keeps the log loaded.
    pub async fn select_conversation(&mut self, conversation_id: &str) -> Result<(), SyncError> {
        let Some(owner_id) = self.owner_id.clone() else {
            return Err(SyncError::TransientFetch(
                "no session; load conversations first".to_string(),
            ));
        };

        let mut messages = self
            .gateway
            .list_messages(conversation_id)
            .await
            .map_err(|err| SyncError::TransientFetch(err.to_string()))?;
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        self.open = Some(OpenConversation {
            id: conversation_id.to_string(),
            messages,
        });

        let log_snapshot = self.open.as_ref().map(|o| Snapshot::take(&o.messages));
        let summary_snapshot = Snapshot::take(&self.conversations);

        if let Some(open) = self.open.as_mut() {
            for message in open.messages.iter_mut() {
                if message.recipient_id == owner_id {
                    message.read = true;
                }
            }
        }
        if let Some(summary) = self.conversations.iter_mut().find(|c| c.id == conversation_id) {
            summary.last_message.unread_flag = false;
        }

        match self.gateway.mark_messages_read(conversation_id, &owner_id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if let (Some(snapshot), Some(open)) = (log_snapshot, self.open.as_mut()) {
                    snapshot.restore(&mut open.messages);
                }
                summary_snapshot.restore(&mut self.conversations);
                Err(SyncError::MutationRejected {
                    action: "mark conversation read",
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Evict the open conversation's log.
    pub fn close_conversation(&mut self) {
        self.open = None;
    }

    /// Optimistically append a message under a temporary id, then reconcile
    /// it against the canonical row from the gateway. On rejection the log
    /// and summary are restored byte-identical to their pre-send snapshots.
    pub async fn send_message(
        &mut self,
        conversation_id: &str,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
    ) -> Result<(), SyncError> {
        let log_snapshot = self
            .open
            .as_ref()
            .filter(|o| o.id == conversation_id)
            .map(|o| Snapshot::take(&o.messages));
        let summary_snapshot = Snapshot::take(&self.conversations);

        let temp_id = Message::pending_id();
        let pending = Message {
            id: temp_id.clone(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            content: content.to_string(),
            created_at: unix_now(),
            read: false,
        };
        if let Some(open) = self.open.as_mut().filter(|o| o.id == conversation_id) {
            open.messages.push(pending.clone());
        }
        if let Some(summary) = self.conversations.iter_mut().find(|c| c.id == conversation_id) {
            advance_last_message(summary, &pending.id, &pending.content, pending.created_at, false);
        }

        match self
            .gateway
            .insert_message(conversation_id, sender_id, recipient_id, content)
            .await
        {
            Ok(canonical) => {
                if let Some(open) = self.open.as_mut().filter(|o| o.id == conversation_id) {
                    resolve_pending_message(&mut open.messages, &temp_id, canonical.clone());
                }
                if let Some(pos) = self.conversations.iter().position(|c| c.id == conversation_id)
                {
                    let summary = &mut self.conversations[pos];
                    if summary.last_message.message_id.as_deref() == Some(temp_id.as_str()) {
                        // The preview still shows the optimistic message;
                        // swap in the canonical id without regressing the
                        // monotonic timestamp.
                        summary.last_message.message_id = Some(canonical.id.clone());
                        summary.last_message.content = canonical.content.clone();
                        summary.last_message.timestamp =
                            summary.last_message.timestamp.max(canonical.created_at);
                        summary.last_message.unread_flag = false;
                    } else {
                        advance_last_message(
                            summary,
                            &canonical.id,
                            &canonical.content,
                            canonical.created_at,
                            false,
                        );
                    }
                    self.resort();
                }
                Ok(())
            }
            Err(err) => {
                if let Some(snapshot) = log_snapshot {
                    if let Some(open) = self.open.as_mut().filter(|o| o.id == conversation_id) {
                        snapshot.restore(&mut open.messages);
                    }
                }
                summary_snapshot.restore(&mut self.conversations);
                Err(SyncError::MutationRejected {
                    action: "send message",
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Idempotent merge of a push-delivered message. The open conversation's
    /// log absorbs it; every summary preview advances by timestamp LWW. The
    /// unread flag is raised only for messages addressed to the current user
    /// in a conversation that is not the open one — an open conversation is
    /// already on screen.
    pub fn apply_incoming_message(&mut self, incoming: Message) {
        let owner_id = self.owner_id.clone().unwrap_or_default();
        let is_open = self
            .open
            .as_ref()
            .map(|o| o.id == incoming.conversation_id)
            .unwrap_or(false);

        if is_open {
            if let Some(open) = self.open.as_mut() {
                let mut message = incoming.clone();
                if message.recipient_id == owner_id {
                    message.read = true;
                }
                merge_message(&mut open.messages, message);
            }
        }

        let unread = incoming.recipient_id == owner_id && !is_open;
        match self
            .conversations
            .iter()
            .position(|c| c.id == incoming.conversation_id)
        {
            Some(pos) => {
                let advanced = advance_last_message(
                    &mut self.conversations[pos],
                    &incoming.id,
                    &incoming.content,
                    incoming.created_at,
                    unread,
                );
                if advanced {
                    self.resort();
                }
            }
            None => {
                // A conversation we have never listed; surface it with a
                // placeholder identity until the next list load resolves it.
                tracing::debug!(
                    conversation = %incoming.conversation_id,
                    "message for unlisted conversation"
                );
                let other = if incoming.sender_id == owner_id {
                    incoming.recipient_id.clone()
                } else {
                    incoming.sender_id.clone()
                };
                self.conversations.push(ConversationSummary {
                    id: incoming.conversation_id.clone(),
                    other_participant: Participant::placeholder(&other),
                    last_message: LastMessage {
                        message_id: Some(incoming.id.clone()),
                        content: incoming.content.clone(),
                        timestamp: incoming.created_at,
                        unread_flag: unread,
                    },
                });
                self.resort();
            }
        }
    }

    fn resort(&mut self) {
        self.conversations
            .sort_by(|a, b| b.last_message.timestamp.cmp(&a.last_message.timestamp));
    }
}

//! In-memory doubles for the external collaborators, used by unit tests
//! across the crate. Failure switches let tests script rejected writes and
//! unreachable reads; recorded calls let them assert batching and the absence
//! of redundant round trips.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::events::ChangeEvent;
use crate::gateway::{ConversationRow, PersistenceGateway, PushChannel, PushSubscription};
use crate::models::{
    LastMessage, Message, NotificationKind, NotificationOrigin, NotificationRecord, Participant,
};

#[derive(Default)]
struct GatewayState {
    notifications: Vec<NotificationRecord>,
    conversations: Vec<ConversationRow>,
    profiles: HashMap<String, Participant>,
    messages: HashMap<String, Vec<Message>>,
    clock: u64,
    next_message_seq: u64,
    fail_list_notifications: bool,
    fail_update_read: bool,
    fail_mark_all_read: bool,
    fail_delete: bool,
    fail_list_conversations: bool,
    fail_profiles: bool,
    fail_list_messages: bool,
    fail_insert_message: bool,
    fail_mark_messages_read: bool,
    calls: Vec<String>,
}

/// Scriptable in-memory `PersistenceGateway`.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<GatewayState>,
}

impl MemoryGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_notification(&self, record: NotificationRecord) {
        self.state.lock().notifications.push(record);
    }

    pub fn push_conversation(&self, row: ConversationRow) {
        self.state.lock().conversations.push(row);
    }

    pub fn put_profile(&self, participant: Participant) {
        let mut state = self.state.lock();
        state.profiles.insert(participant.id.clone(), participant);
    }

    pub fn push_message(&self, message: Message) {
        let mut state = self.state.lock();
        state
            .messages
            .entry(message.conversation_id.clone())
            .or_default()
            .push(message);
    }

    pub fn set_clock(&self, unix_seconds: u64) {
        self.state.lock().clock = unix_seconds;
    }

    pub fn fail_list_notifications(&self, fail: bool) {
        self.state.lock().fail_list_notifications = fail;
    }

    pub fn fail_update_read(&self, fail: bool) {
        self.state.lock().fail_update_read = fail;
    }

    pub fn fail_mark_all_read(&self, fail: bool) {
        self.state.lock().fail_mark_all_read = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state.lock().fail_delete = fail;
    }

    pub fn fail_list_conversations(&self, fail: bool) {
        self.state.lock().fail_list_conversations = fail;
    }

    pub fn fail_profiles(&self, fail: bool) {
        self.state.lock().fail_profiles = fail;
    }

    pub fn fail_list_messages(&self, fail: bool) {
        self.state.lock().fail_list_messages = fail;
    }

    pub fn fail_insert_message(&self, fail: bool) {
        self.state.lock().fail_insert_message = fail;
    }

    pub fn fail_mark_messages_read(&self, fail: bool) {
        self.state.lock().fail_mark_messages_read = fail;
    }

    /// Every call recorded as `"method(args)"`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn stored_notifications(&self) -> Vec<NotificationRecord> {
        self.state.lock().notifications.clone()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn list_notifications(&self, owner_id: &str) -> Result<Vec<NotificationRecord>> {
        let mut state = self.state.lock();
        state.calls.push(format!("list_notifications({owner_id})"));
        if state.fail_list_notifications {
            bail!("persistence unavailable");
        }
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn update_notification_read(&self, id: &str, read: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("update_notification_read({id}, {read})"));
        if state.fail_update_read {
            bail!("write rejected");
        }
        if let Some(n) = state.notifications.iter_mut().find(|n| n.id == id) {
            n.read = read;
        }
        Ok(())
    }

    async fn mark_notifications_read(&self, ids: &[String]) -> Result<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(format!("mark_notifications_read({})", ids.join(",")));
        if state.fail_mark_all_read {
            bail!("batch write rejected");
        }
        for n in state.notifications.iter_mut() {
            if ids.contains(&n.id) {
                n.read = true;
            }
        }
        Ok(())
    }

    async fn delete_notification(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("delete_notification({id})"));
        if state.fail_delete {
            bail!("delete rejected");
        }
        state.notifications.retain(|n| n.id != id);
        Ok(())
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<ConversationRow>> {
        let mut state = self.state.lock();
        state.calls.push(format!("list_conversations({owner_id})"));
        if state.fail_list_conversations {
            bail!("persistence unavailable");
        }
        Ok(state.conversations.clone())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Participant> {
        let mut state = self.state.lock();
        state.calls.push(format!("fetch_profile({user_id})"));
        if state.fail_profiles {
            bail!("profile service unavailable");
        }
        state
            .profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no profile for {user_id}"))
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let mut state = self.state.lock();
        state.calls.push(format!("list_messages({conversation_id})"));
        if state.fail_list_messages {
            bail!("persistence unavailable");
        }
        Ok(state
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        recipient_id: &str,
        content: &str,
    ) -> Result<Message> {
        let mut state = self.state.lock();
        state.calls.push(format!("insert_message({conversation_id})"));
        if state.fail_insert_message {
            bail!("insert rejected");
        }
        state.next_message_seq += 1;
        state.clock += 1;
        let message = Message {
            id: format!("m-{}", state.next_message_seq),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            content: content.to_string(),
            created_at: state.clock,
            read: false,
        };
        state
            .messages
            .entry(conversation_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn mark_messages_read(&self, conversation_id: &str, reader_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push(format!("mark_messages_read({conversation_id}, {reader_id})"));
        if state.fail_mark_messages_read {
            bail!("write rejected");
        }
        if let Some(log) = state.messages.get_mut(conversation_id) {
            for m in log.iter_mut() {
                if m.recipient_id == reader_id {
                    m.read = true;
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct ChannelState {
    senders: HashMap<String, UnboundedSender<ChangeEvent>>,
    torn_down: Vec<String>,
    subscribe_calls: Vec<String>,
    fail_subscribe: bool,
}

/// Scriptable in-memory `PushChannel`. Tests push events into live topics and
/// can drop a topic's sender to simulate a lost connection.
#[derive(Default)]
pub struct ScriptedPushChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl ScriptedPushChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.state.lock().fail_subscribe = fail;
    }

    /// Deliver an event to the live subscription on `topic`, if any.
    pub fn push(&self, topic: &str, event: ChangeEvent) -> bool {
        let state = self.state.lock();
        match state.senders.get(topic) {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Simulate a dropped connection: the receiver sees end-of-stream.
    pub fn drop_topic(&self, topic: &str) {
        self.state.lock().senders.remove(topic);
    }

    pub fn torn_down(&self) -> Vec<String> {
        self.state.lock().torn_down.clone()
    }

    pub fn subscribe_calls(&self) -> Vec<String> {
        self.state.lock().subscribe_calls.clone()
    }
}

#[async_trait]
impl PushChannel for ScriptedPushChannel {
    async fn subscribe(&self, topic: &str) -> Result<PushSubscription> {
        let mut state = self.state.lock();
        state.subscribe_calls.push(topic.to_string());
        if state.fail_subscribe {
            bail!("channel unreachable");
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.senders.insert(topic.to_string(), tx);
        let teardown_state = self.state.clone();
        let teardown_topic = topic.to_string();
        Ok(PushSubscription::new(topic, rx, move || {
            let mut state = teardown_state.lock();
            state.senders.remove(&teardown_topic);
            state.torn_down.push(teardown_topic.clone());
        }))
    }
}

/// Shorthand constructors for fixture data.
pub fn notification(
    id: &str,
    owner_id: &str,
    created_at: u64,
    read: bool,
) -> NotificationRecord {
    NotificationRecord {
        id: id.to_string(),
        title: format!("notification {id}"),
        body: String::new(),
        created_at,
        read,
        kind: NotificationKind::Other,
        owner_id: owner_id.to_string(),
        origin: NotificationOrigin::Persisted,
    }
}

pub fn message(id: &str, conversation_id: &str, sender: &str, recipient: &str, created_at: u64) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id: sender.to_string(),
        recipient_id: recipient.to_string(),
        content: format!("message {id}"),
        created_at,
        read: false,
    }
}

pub fn conversation_row(id: &str, other: &str, timestamp: u64, unread: bool) -> ConversationRow {
    ConversationRow {
        id: id.to_string(),
        other_participant_id: other.to_string(),
        last_message: LastMessage {
            message_id: None,
            content: format!("last in {id}"),
            timestamp,
            unread_flag: unread,
        },
    }
}

pub fn participant(id: &str, name: &str) -> Participant {
    Participant {
        id: id.to_string(),
        display_name: name.to_string(),
        avatar_ref: None,
        role: "client".to_string(),
    }
}

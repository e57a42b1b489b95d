//! Pure badge derivation. Every count a UI surface renders is recomputed from
//! the canonical sets; nothing here (or anywhere else) stores a counter.

use crate::models::{ConversationSummary, NotificationRecord};

pub fn unread_notification_count(notifications: &[NotificationRecord]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

pub fn unread_message_count(conversations: &[ConversationSummary]) -> usize {
    conversations
        .iter()
        .filter(|c| c.last_message.unread_flag)
        .count()
}

/// Bundle of every derived badge value, recomputed after each merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub unread_notifications: usize,
    pub unread_messages: usize,
}

impl Counters {
    pub fn derive(
        notifications: &[NotificationRecord],
        conversations: &[ConversationSummary],
    ) -> Self {
        Self {
            unread_notifications: unread_notification_count(notifications),
            unread_messages: unread_message_count(conversations),
        }
    }
}

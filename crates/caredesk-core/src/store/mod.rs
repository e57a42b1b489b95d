pub mod conversation_index;
pub mod counters;
pub mod notification_store;

pub use conversation_index::ConversationIndex;
pub use counters::{unread_message_count, unread_notification_count, Counters};
pub use notification_store::NotificationStore;

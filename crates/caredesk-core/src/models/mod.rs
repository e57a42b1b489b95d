mod conversation;
mod message;
mod notification;

pub use conversation::{ConversationSummary, LastMessage, Participant};
pub use message::Message;
pub use notification::{NotificationKind, NotificationOrigin, NotificationRecord};

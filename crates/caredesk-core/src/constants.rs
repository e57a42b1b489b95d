//! Application-wide constants
//!
//! Centralized location for magic strings and configuration defaults that are
//! used across multiple modules.

/// Title of the synthetic welcome notification.
pub const WELCOME_TITLE: &str = "Welcome to Caredesk";

/// Body of the synthetic welcome notification.
pub const WELCOME_BODY: &str =
    "Thanks for joining. This is where appointment updates, reviews and new messages show up.";

/// Prefix of locally-generated temporary message ids. A message whose id
/// carries this prefix has not been confirmed by the persistence gateway yet.
pub const PENDING_ID_PREFIX: &str = "pending-";

/// Display name used when a participant's profile lookup fails.
pub const PLACEHOLDER_DISPLAY_NAME: &str = "Unknown user";

/// Most-recent window kept by `NotificationStore::load`.
pub const DEFAULT_NOTIFICATION_WINDOW: usize = 50;

/// Total attempt cap across a load-strategy chain.
pub const DEFAULT_LOAD_ATTEMPTS: usize = 3;

/// Resubscribe attempts per `pump()` after a dropped push subscription.
pub const DEFAULT_RESUBSCRIBE_ATTEMPTS: usize = 1;

/// Push topic carrying message events for one conversation.
pub fn conversation_topic(conversation_id: &str) -> String {
    format!("conversation/{conversation_id}")
}

/// Push topic carrying notification events for one owner.
pub fn notification_topic(owner_id: &str) -> String {
    format!("notifications/{owner_id}")
}

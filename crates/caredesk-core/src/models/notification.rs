use serde::{Deserialize, Serialize};

/// Category of a notification. `Welcome` is reserved: it marks the one-time
/// welcome message and is never assigned to user-generated rows, which is what
/// lets `synthesize_welcome_if_absent` detect an existing welcome reliably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Welcome,
    Appointment,
    Message,
    Review,
    Update,
    Other,
}

/// Where a notification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationOrigin {
    /// Generated client-side (the welcome record); mutations are local-only.
    Synthetic,
    /// Backed by a persistence row; mutations dispatch to the gateway.
    Persisted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    /// Unix seconds.
    pub created_at: u64,
    pub read: bool,
    pub kind: NotificationKind,
    pub owner_id: String,
    pub origin: NotificationOrigin,
}

impl NotificationRecord {
    pub fn is_synthetic(&self) -> bool {
        self.origin == NotificationOrigin::Synthetic
    }

    /// The deterministic id of the synthetic welcome record for an owner.
    /// Derived from the owner id so that re-synthesis can never mint a second
    /// record for the same owner.
    pub fn welcome_id(owner_id: &str) -> String {
        format!("welcome-{owner_id}")
    }

    /// Build the synthetic welcome record for an owner.
    pub fn welcome(owner_id: &str, created_at: u64) -> Self {
        Self {
            id: Self::welcome_id(owner_id),
            title: crate::constants::WELCOME_TITLE.to_string(),
            body: crate::constants::WELCOME_BODY.to_string(),
            created_at,
            read: false,
            kind: NotificationKind::Welcome,
            owner_id: owner_id.to_string(),
            origin: NotificationOrigin::Synthetic,
        }
    }
}

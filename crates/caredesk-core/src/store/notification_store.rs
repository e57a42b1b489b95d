use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::anyhow;

use crate::config::EngineConfig;
use crate::errors::SyncError;
use crate::gateway::PersistenceGateway;
use crate::models::{NotificationKind, NotificationRecord};
use crate::reconcile::{merge_notification, Snapshot};
use crate::store::counters::unread_notification_count;
use crate::strategy::LoadChain;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Canonical in-memory model of one user's notifications, synthetic and
/// persisted. The unread badge is always derived from this set, never stored.
pub struct NotificationStore {
    gateway: Arc<dyn PersistenceGateway>,
    window: usize,
    load_attempts: usize,
    owner_id: Option<String>,
    records: Vec<NotificationRecord>,
    /// Last known-good list, served when a fresh fetch fails.
    cache: Option<Vec<NotificationRecord>>,
}

impl NotificationStore {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, config: &EngineConfig) -> Self {
        Self {
            gateway,
            window: config.notification_window,
            load_attempts: config.load_attempts,
            owner_id: None,
            records: Vec::new(),
            cache: None,
        }
    }

    pub fn notifications(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn unread_count(&self) -> usize {
        unread_notification_count(&self.records)
    }

    /// Discard all state (logout).
    pub fn clear(&mut self) {
        self.owner_id = None;
        self.records.clear();
        self.cache = None;
    }

    /// Fetch the most-recent window of persisted notifications, newest first.
    ///
    /// Runs the ordered strategy chain: fresh fetch, then the last known-good
    /// cache. A degraded load returns `Ok(Some(TransientFetch))` so the
    /// caller can show a non-blocking warning; only when there is no cache at
    /// all does the aggregated chain failure propagate.
    pub async fn load(&mut self, owner_id: &str) -> Result<Option<SyncError>, SyncError> {
        let gateway = self.gateway.clone();
        let owner = owner_id.to_string();
        let window = self.window;
        let cached = self.cache.clone();

        let outcome = LoadChain::new("notifications", self.load_attempts)
            .push("gateway", async move {
                let mut records = gateway.list_notifications(&owner).await?;
                records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                records.truncate(window);
                Ok(records)
            })
            .push("cache", async move {
                cached.ok_or_else(|| anyhow!("no cached notifications"))
            })
            .run()
            .await?;

        let fresh = outcome.strategy_index == 0;
        self.owner_id = Some(owner_id.to_string());
        self.records = outcome.value;
        if fresh {
            self.cache = Some(self.records.clone());
            Ok(None)
        } else {
            Ok(Some(SyncError::TransientFetch(outcome.failures.join("; "))))
        }
    }

    /// Prepend the one-time synthetic welcome record when no persisted record
    /// carries the reserved `Welcome` kind. Idempotent: a second call can
    /// never produce a second record. Returns whether a record was added.
    pub fn synthesize_welcome_if_absent(&mut self) -> bool {
        let Some(owner_id) = self.owner_id.clone() else {
            return false;
        };
        if self
            .records
            .iter()
            .any(|n| n.kind == NotificationKind::Welcome)
        {
            return false;
        }
        self.records
            .insert(0, NotificationRecord::welcome(&owner_id, unix_now()));
        true
    }

    /// Optimistically flip a record's read flag.
    ///
    /// Synthetic records mutate locally only. Persisted records dispatch the
    /// update and roll back to the pre-call snapshot on rejection. A call
    /// that targets the state the record is already in (including a repeat of
    /// one still awaiting confirmation) is coalesced: no second remote call.
    pub async fn mark_read(&mut self, id: &str, read: bool) -> Result<(), SyncError> {
        let Some(record) = self.records.iter().find(|n| n.id == id) else {
            tracing::debug!(id, "mark_read on unknown notification, ignoring");
            return Ok(());
        };
        if record.read == read {
            return Ok(());
        }
        if record.is_synthetic() {
            if let Some(record) = self.records.iter_mut().find(|n| n.id == id) {
                record.read = read;
            }
            return Ok(());
        }

        let snapshot = Snapshot::take(&self.records);
        if let Some(record) = self.records.iter_mut().find(|n| n.id == id) {
            record.read = read;
        }
        match self.gateway.update_notification_read(id, read).await {
            Ok(()) => Ok(()),
            Err(err) => {
                snapshot.restore(&mut self.records);
                Err(SyncError::MutationRejected {
                    action: "mark notification read",
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Mark everything read. Synthetic records flip locally and stay
    /// committed; persisted unread records go out as one batch call whose
    /// failure rolls back only the persisted subset.
    pub async fn mark_all_read(&mut self) -> Result<(), SyncError> {
        for record in self.records.iter_mut() {
            if record.is_synthetic() {
                record.read = true;
            }
        }

        let persisted_unread: Vec<String> = self
            .records
            .iter()
            .filter(|n| !n.is_synthetic() && !n.read)
            .map(|n| n.id.clone())
            .collect();
        if persisted_unread.is_empty() {
            return Ok(());
        }

        for record in self.records.iter_mut() {
            if persisted_unread.contains(&record.id) {
                record.read = true;
            }
        }
        match self.gateway.mark_notifications_read(&persisted_unread).await {
            Ok(()) => Ok(()),
            Err(err) => {
                for record in self.records.iter_mut() {
                    if persisted_unread.contains(&record.id) {
                        record.read = false;
                    }
                }
                Err(SyncError::MutationRejected {
                    action: "mark all notifications read",
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Remove a record locally. Persisted records issue a fire-and-forget
    /// remote delete; its failure is logged, not rolled back (deletion is not
    /// safety-critical, and resurrecting a dismissed notification would be
    /// worse than leaking a row).
    pub fn delete(&mut self, id: &str) {
        let Some(pos) = self.records.iter().position(|n| n.id == id) else {
            return;
        };
        let record = self.records.remove(pos);
        if record.is_synthetic() {
            return;
        }
        let gateway = self.gateway.clone();
        let id = record.id;
        tokio::spawn(async move {
            if let Err(err) = gateway.delete_notification(&id).await {
                tracing::error!(%id, error = %err, "remote notification delete failed");
            }
        });
    }

    /// Idempotent merge of a push-delivered notification row.
    pub fn apply_remote(&mut self, incoming: NotificationRecord) {
        if let Some(owner_id) = &self.owner_id {
            if incoming.owner_id != *owner_id {
                tracing::debug!(
                    id = %incoming.id,
                    "notification event for another owner, ignoring"
                );
                return;
            }
        }
        merge_notification(&mut self.records, incoming);
    }
}

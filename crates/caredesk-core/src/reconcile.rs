//! Idempotent merge rules shared by every mutation path.
//!
//! Optimistic local edits, gateway confirmations and push-channel events all
//! funnel through these functions, so duplicate or out-of-order delivery
//! converges to the same state as a single in-order delivery. Counters are
//! never touched here — they are re-derived from the post-merge sets by
//! `store::counters`.

use crate::models::{ConversationSummary, Message, NotificationRecord};

/// Exact pre-mutation snapshot for the optimistic apply/confirm/rollback
/// discipline. Taken before the local edit; `restore` puts the slot back
/// byte-identical when the remote call is rejected.
pub struct Snapshot<T: Clone>(T);

impl<T: Clone> Snapshot<T> {
    pub fn take(value: &T) -> Self {
        Self(value.clone())
    }

    pub fn restore(self, slot: &mut T) {
        *slot = self.0;
    }
}

/// Upsert a notification, keeping the list sorted newest-first.
///
/// A known id is replaced in place, except that `read` merges monotonically
/// like `merge_message`: a redelivered event still carrying `read = false`
/// cannot clear a locally-confirmed read flag. An unknown id is inserted at
/// its sorted position. Applying the same record twice is a no-op the second
/// time.
pub fn merge_notification(list: &mut Vec<NotificationRecord>, incoming: NotificationRecord) {
    if let Some(existing) = list.iter_mut().find(|n| n.id == incoming.id) {
        let read = existing.read || incoming.read;
        *existing = incoming;
        existing.read = read;
        return;
    }
    let pos = list.partition_point(|n| n.created_at > incoming.created_at);
    list.insert(pos, incoming);
}

/// Merge a message into a log kept sorted oldest-first.
///
/// A known id only advances the monotonic `read` flag (message content is
/// immutable once persisted); an unknown id is inserted at its sorted
/// position. Idempotent under redelivery.
pub fn merge_message(log: &mut Vec<Message>, incoming: Message) {
    if let Some(existing) = log.iter_mut().find(|m| m.id == incoming.id) {
        existing.read = existing.read || incoming.read;
        return;
    }
    let pos = log.partition_point(|m| m.created_at <= incoming.created_at);
    log.insert(pos, incoming);
}

/// Replace an optimistic message (temporary id) with its confirmed canonical
/// row, at the same array position so UI keys and scroll stay stable.
///
/// If the push channel already delivered the canonical row before the
/// confirmation arrived, the temporary record is removed instead.
pub fn resolve_pending_message(log: &mut Vec<Message>, temp_id: &str, canonical: Message) {
    if log.iter().any(|m| m.id == canonical.id) {
        log.retain(|m| m.id != temp_id);
        return;
    }
    match log.iter().position(|m| m.id == temp_id) {
        Some(pos) => log[pos] = canonical,
        None => merge_message(log, canonical),
    }
}

/// Last-writer-wins on the conversation preview, by message timestamp rather
/// than arrival order. A redelivery of the exact message the preview already
/// shows (same id and timestamp) is a no-op, so an at-least-once channel
/// replaying an old event cannot re-raise a cleared unread flag. Returns
/// whether the preview advanced.
pub fn advance_last_message(
    summary: &mut ConversationSummary,
    message_id: &str,
    content: &str,
    timestamp: u64,
    unread: bool,
) -> bool {
    let last = &mut summary.last_message;
    if timestamp < last.timestamp {
        return false;
    }
    if timestamp == last.timestamp && last.message_id.as_deref() == Some(message_id) {
        return false;
    }
    last.message_id = Some(message_id.to_string());
    last.content = content.to_string();
    last.timestamp = timestamp;
    last.unread_flag = unread;
    true
}

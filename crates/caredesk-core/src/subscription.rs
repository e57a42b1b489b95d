//! Per-client push subscription lifecycle: Idle → Subscribed(conversation) →
//! Idle. At most one conversation subscription is live at a time, and every
//! event is tagged with the generation of the subscription it was read from,
//! so an event still in flight when the subscription swaps can be recognized
//! as stale and discarded instead of corrupting the newly opened view.

use std::sync::Arc;

use crate::constants::conversation_topic;
use crate::errors::SyncError;
use crate::events::TaggedEvent;
use crate::gateway::{PushChannel, PushSubscription};

struct ActiveSubscription {
    conversation_id: String,
    generation: u64,
    subscription: PushSubscription,
}

/// What a poll of the live subscription produced.
pub enum Poll {
    /// An event, tagged with its subscription generation.
    Event(TaggedEvent),
    /// Nothing queued right now.
    Idle,
    /// The event stream closed; the subscription is gone until the engine
    /// resubscribes.
    Dropped { conversation_id: String },
}

pub struct SubscriptionManager {
    channel: Arc<dyn PushChannel>,
    generation: u64,
    active: Option<ActiveSubscription>,
}

impl SubscriptionManager {
    pub fn new(channel: Arc<dyn PushChannel>) -> Self {
        Self {
            channel,
            generation: 0,
            active: None,
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribed_conversation(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.conversation_id.as_str())
    }

    /// An event is current only if it carries the present generation; any
    /// older tag means it was read from a subscription that has since been
    /// swapped away.
    pub fn is_current(&self, tagged: &TaggedEvent) -> bool {
        tagged.generation == self.generation
    }

    /// Swap the live subscription to `conversation_id`.
    ///
    /// The generation is bumped before the old subscription is torn down, so
    /// an event from the old conversation that is already in flight carries a
    /// stale tag from this point on. Teardown of the old subscription always
    /// completes before the new subscribe starts.
    pub async fn open(&mut self, conversation_id: &str) -> Result<(), SyncError> {
        self.generation += 1;
        if let Some(active) = self.active.take() {
            active.subscription.unsubscribe();
        }

        let topic = conversation_topic(conversation_id);
        match self.channel.subscribe(&topic).await {
            Ok(subscription) => {
                self.active = Some(ActiveSubscription {
                    conversation_id: conversation_id.to_string(),
                    generation: self.generation,
                    subscription,
                });
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%topic, error = %err, "push subscribe failed");
                Err(SyncError::SubscriptionDropped { topic })
            }
        }
    }

    /// Tear down the live subscription (conversation closed).
    pub fn close(&mut self) {
        self.generation += 1;
        if let Some(active) = self.active.take() {
            active.subscription.unsubscribe();
        }
    }

    /// Non-blocking poll of the live subscription.
    pub fn poll(&mut self) -> Poll {
        let Some(active) = self.active.as_mut() else {
            return Poll::Idle;
        };
        match active.subscription.try_next() {
            Ok(Some(event)) => Poll::Event(TaggedEvent {
                generation: active.generation,
                event,
            }),
            Ok(None) => Poll::Idle,
            Err(()) => {
                let conversation_id = active.conversation_id.clone();
                self.active = None;
                tracing::warn!(conversation = %conversation_id, "push subscription dropped");
                Poll::Dropped { conversation_id }
            }
        }
    }
}

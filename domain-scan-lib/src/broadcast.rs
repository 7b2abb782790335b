//! Progress fan-out to any number of subscribers.
//!
//! Every subscriber owns a bounded queue. Publishing never blocks: when a
//! subscriber's queue is full the event is dropped for that subscriber only,
//! and a subscriber whose receiving side is gone is pruned on the next publish.

use crate::types::{ScanEvent, DEFAULT_SUBSCRIBER_CAPACITY};
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};

type SubscriberMap = HashMap<u64, mpsc::Sender<String>>;

struct Registry {
    subscribers: Mutex<SubscriberMap>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Registry {
    fn subscribers(&self) -> MutexGuard<'_, SubscriberMap> {
        // A panic while holding this lock cannot leave the map half-updated.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Registry of subscriber queues. Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct ProgressBroadcaster {
    registry: Arc<Registry>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Broadcaster whose subscribers each buffer at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.registry.capacity);
        self.registry.subscribers().insert(id, tx);
        tracing::debug!(subscriber = id, "subscriber registered");

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let removed = self.registry.subscribers().remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = id, "subscriber removed");
        }
        removed
    }

    /// Offer an event to every subscriber without waiting.
    ///
    /// Returns how many subscribers actually queued it.
    pub fn publish(&self, event: &ScanEvent) -> usize {
        let line = event.to_string();
        let mut delivered = 0;

        self.registry
            .subscribers()
            .retain(|id, tx| match tx.try_send(line.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(subscriber = *id, event = %line, "subscriber queue full, event dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            });

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers().len()
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBroadcaster")
            .field("subscribers", &self.subscriber_count())
            .field("capacity", &self.registry.capacity)
            .finish()
    }
}

/// Receiving end of one subscription, yielding `kind:payload` strings.
///
/// Dropping it unregisters the subscriber.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<String>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next raw event line, or `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Next event line if one is already queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Next event, parsed. Lines that do not parse are skipped.
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        while let Some(line) = self.rx.recv().await {
            if let Some(event) = ScanEvent::parse(&line) {
                return Some(event);
            }
        }
        None
    }
}

impl Stream for Subscription {
    type Item = String;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.subscribers().remove(&self.id);
        }
    }
}

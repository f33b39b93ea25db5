// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered publish/subscribe channel for store mutation events.
//!
//! Every subscriber owns an unbounded FIFO queue, so [`EventBus::publish`]
//! never blocks the publisher and each subscriber observes events in exactly
//! the order they were published. Subscriptions are released explicitly via
//! [`EventBus::unsubscribe`]; dropping the receiving half also detaches the
//! subscriber on the next publish.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Identifies a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// The receiving side of a subscription.
#[derive(Debug)]
pub struct Subscription<E> {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<E>,
}

impl<E> Subscription<E> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event. Returns `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<E> {
        self.receiver.recv().await
    }

    /// Number of events queued but not yet received.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Splits into id and raw receiver.
    pub fn into_parts(self) -> (SubscriptionId, mpsc::UnboundedReceiver<E>) {
        (self.id, self.receiver)
    }
}

/// Fan-out bus delivering cloned events to every subscriber.
pub struct EventBus<E> {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, mpsc::UnboundedSender<E>)>>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a new subscriber. Only events published afterwards are delivered.
    pub fn subscribe(&self) -> Subscription<E> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, tx));
        debug!(subscription = %id, "subscriber attached");
        Subscription { id, receiver: rx }
    }

    /// Detaches a subscriber. Events already queued remain receivable.
    ///
    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!(subscription = %id, "subscriber detached");
        }
        removed
    }

    /// Delivers `event` to every live subscriber and returns the delivery count.
    pub fn publish(&self, event: &E) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|(id, tx)| {
            let delivered = tx.send(event.clone()).is_ok();
            if !delivered {
                trace!(subscription = %id, "pruning closed subscriber");
            }
            delivered
        });
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        for i in 0..100 {
            bus.publish(&i);
        }
        for i in 0..100 {
            assert_eq!(sub.recv().await, Some(i));
        }
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.publish(&"hello".to_string()), 2);
        assert_eq!(a.recv().await.as_deref(), Some("hello"));
        assert_eq!(b.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery_but_keeps_queue() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(&1);
        assert!(bus.unsubscribe(sub.id()));
        bus.publish(&2);
        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, None);
        assert!(!bus.unsubscribe(sub.id()));
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.publish(&1u8), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn pending_counts_queued_events() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        bus.publish(&1u8);
        bus.publish(&2u8);
        assert_eq!(sub.pending(), 2);
    }
}

//! In-process change feed for tests and the replay binary.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("change feed lock poisoned")]
pub struct FeedPoisoned;

/// Broadcast feed over std channels.
///
/// Each publish clones the message into every live subscriber's queue.
/// A subscriber whose [`Subscription`] was dropped is forgotten on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    senders: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.lock().map_or(0, |senders| senders.len())
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = FeedPoisoned;

    fn publish(&self, message: M) -> Result<(), FeedPoisoned> {
        let mut senders = self.senders.lock().map_err(|_| FeedPoisoned)?;
        senders.retain(|tx| tx.send(message.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        match self.senders.lock() {
            Ok(mut senders) => senders.push(tx),
            // Nothing will ever be published on a poisoned feed.
            Err(_) => drop(tx),
        }
        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_gets_a_copy() {
        let bus: InMemoryEventBus<&str> = InMemoryEventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish("orders.create").unwrap();
        bus.publish("notifications.create").unwrap();

        assert_eq!(a.drain(), vec!["orders.create", "notifications.create"]);
        assert_eq!(b.drain(), vec!["orders.create", "notifications.create"]);
    }

    #[test]
    fn dropped_subscribers_are_forgotten_on_publish() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(1).unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.try_next(), Some(1));
    }

    #[test]
    fn late_subscribers_miss_earlier_messages() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        bus.publish(1).unwrap();
        let sub = bus.subscribe();
        assert_eq!(sub.try_next(), None);
    }
}

//! Minimal multicast channel for values produced on the frame loop.
//!
//! Subscribers only observe values published after they subscribed; nothing
//! is replayed. Dropped subscriptions are pruned on the next publish.
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug)]
pub struct Publisher<T> {
    senders: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> Publisher<T> {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Subscription<T> {
        let (sender, receiver) = unbounded();
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        Subscription { receiver }
    }

    /// Sends `value` to every live subscriber and returns how many received it.
    pub fn publish(&self, value: T) -> usize {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|sender| sender.send(value.clone()).is_ok());
        senders.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T: Clone> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct Subscription<T> {
    receiver: Receiver<T>,
}

impl<T> Subscription<T> {
    pub fn try_next(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn next_timeout(&self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Discards everything queued except the newest value.
    pub fn latest(&self) -> Option<T> {
        self.receiver.try_iter().last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_subscribers_see_only_new_values() {
        let publisher = Publisher::new();
        let early = publisher.subscribe();
        publisher.publish(1);

        let late = publisher.subscribe();
        publisher.publish(2);

        assert_eq!(early.drain(), vec![1, 2]);
        assert_eq!(late.drain(), vec![2]);
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let publisher = Publisher::new();
        let kept = publisher.subscribe();
        drop(publisher.subscribe());

        assert_eq!(publisher.publish("frame"), 1);
        assert_eq!(publisher.subscriber_count(), 1);
        assert_eq!(kept.latest(), Some("frame"));
    }
}

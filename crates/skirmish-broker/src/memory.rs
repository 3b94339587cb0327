//! In-process [`Broker`] used by tests and local runs.
//!
//! Queues are plain FIFO buffers with a single waiting consumer. Fan-out
//! publications are recorded per exchange so tests can inspect exactly what
//! every node would have received. The broker can be told to reject
//! publications, which is how tests exercise the unacknowledged-delivery path,
//! and a receive error can be queued between messages the way a NATS pull
//! stream reports a missed heartbeat and then keeps delivering.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::BrokerError;
use crate::{Broker, Delivery, Inbound, Route};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
enum Entry {
    Message(Vec<u8>),
    ReceiveError(String),
}

#[derive(Debug, Default)]
struct Queue {
    messages: Mutex<VecDeque<Entry>>,
    notify: Notify,
    closed: AtomicBool,
    delivered: AtomicU64,
    acked: AtomicU64,
}

impl Queue {
    fn push(&self, entry: Entry) {
        lock(&self.messages).push_back(entry);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Entry> {
        lock(&self.messages).pop_front()
    }
}

#[derive(Debug, Default)]
struct Shared {
    queues: Mutex<HashMap<String, Arc<Queue>>>,
    fanout: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    reject_publishes: AtomicBool,
}

/// An in-memory broker. Clones share the same queues.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, name: &str) -> Arc<Queue> {
        Arc::clone(
            lock(&self.shared.queues)
                .entry(name.to_owned())
                .or_default(),
        )
    }

    /// Enqueue a message directly, as an external producer would.
    pub fn inject(&self, queue: &str, payload: impl Into<Vec<u8>>) {
        self.queue(queue).push(Entry::Message(payload.into()));
    }

    /// Queue a receive error: the subscriber's next read after the messages
    /// already queued yields [`BrokerError::Receive`], and delivery carries on
    /// afterwards.
    pub fn inject_receive_error(&self, queue: &str, reason: &str) {
        self.queue(queue).push(Entry::ReceiveError(reason.to_owned()));
    }

    /// End the subscription on `queue` once its remaining messages are
    /// delivered.
    pub fn close(&self, queue: &str) {
        let queue = self.queue(queue);
        queue.closed.store(true, Ordering::SeqCst);
        queue.notify.notify_one();
    }

    /// Make every following publication fail (or succeed again).
    pub fn reject_publishes(&self, reject: bool) {
        self.shared.reject_publishes.store(reject, Ordering::SeqCst);
    }

    /// Messages still waiting in `queue`.
    pub fn pending(&self, queue: &str) -> Vec<Vec<u8>> {
        lock(&self.queue(queue).messages)
            .iter()
            .filter_map(|entry| match entry {
                Entry::Message(payload) => Some(payload.clone()),
                Entry::ReceiveError(_) => None,
            })
            .collect()
    }

    /// Everything published to `exchange` so far.
    pub fn fanout_messages(&self, exchange: &str) -> Vec<Vec<u8>> {
        lock(&self.shared.fanout)
            .get(exchange)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of deliveries handed out from `queue`.
    pub fn delivered(&self, queue: &str) -> u64 {
        self.queue(queue).delivered.load(Ordering::SeqCst)
    }

    /// Number of deliveries from `queue` that were acknowledged.
    pub fn acked(&self, queue: &str) -> u64 {
        self.queue(queue).acked.load(Ordering::SeqCst)
    }
}

impl Broker for MemoryBroker {
    type Inbound = MemoryInbound;

    async fn subscribe(&self, queue: &str) -> Result<MemoryInbound, BrokerError> {
        Ok(MemoryInbound {
            queue: self.queue(queue),
        })
    }

    async fn publish(&self, route: &Route, payload: Vec<u8>) -> Result<(), BrokerError> {
        if self.shared.reject_publishes.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish(format!("{route} rejected the publication")));
        }
        match route {
            Route::Queue(queue) => self.queue(queue).push(Entry::Message(payload)),
            Route::Fanout(exchange) => lock(&self.shared.fanout)
                .entry(exchange.clone())
                .or_default()
                .push(payload),
        }
        Ok(())
    }

    async fn purge(&self, queue: &str) -> Result<u64, BrokerError> {
        let queue = self.queue(queue);
        let mut messages = lock(&queue.messages);
        let purged = u64::try_from(messages.len()).unwrap_or(u64::MAX);
        messages.clear();
        Ok(purged)
    }
}

/// Deliveries from one in-memory queue.
#[derive(Debug)]
pub struct MemoryInbound {
    queue: Arc<Queue>,
}

impl Inbound for MemoryInbound {
    type Delivery = MemoryDelivery;

    async fn next(&mut self) -> Option<Result<MemoryDelivery, BrokerError>> {
        loop {
            match self.queue.pop() {
                Some(Entry::Message(payload)) => {
                    self.queue.delivered.fetch_add(1, Ordering::SeqCst);
                    return Some(Ok(MemoryDelivery {
                        payload,
                        queue: Arc::clone(&self.queue),
                    }));
                }
                Some(Entry::ReceiveError(reason)) => {
                    return Some(Err(BrokerError::Receive(reason)));
                }
                None => {}
            }
            if self.queue.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.queue.notify.notified().await;
        }
    }
}

/// One in-memory message awaiting acknowledgement.
#[derive(Debug)]
pub struct MemoryDelivery {
    payload: Vec<u8>,
    queue: Arc<Queue>,
}

impl Delivery for MemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(self) -> Result<(), BrokerError> {
        self.queue.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn queue_delivers_in_order_and_counts_acks() {
        let broker = MemoryBroker::new();
        broker.inject("q", b"first".to_vec());
        broker
            .publish(&Route::Queue("q".to_owned()), b"second".to_vec())
            .await
            .unwrap();
        broker.close("q");

        let mut inbound = broker.subscribe("q").await.unwrap();
        let first = inbound.next().await.unwrap().unwrap();
        assert_eq!(first.payload(), b"first");
        first.ack().await.unwrap();

        let second = inbound.next().await.unwrap().unwrap();
        assert_eq!(second.payload(), b"second");
        drop(second);

        assert!(inbound.next().await.is_none());
        assert_eq!(broker.delivered("q"), 2);
        assert_eq!(broker.acked("q"), 1);
    }

    #[tokio::test]
    async fn receive_error_does_not_end_the_subscription() {
        let broker = MemoryBroker::new();
        broker.inject("q", b"before".to_vec());
        broker.inject_receive_error("q", "missed idle heartbeat");
        broker.inject("q", b"after".to_vec());
        broker.close("q");

        let mut inbound = broker.subscribe("q").await.unwrap();
        assert_eq!(inbound.next().await.unwrap().unwrap().payload(), b"before");
        assert_eq!(
            inbound.next().await.unwrap().unwrap_err(),
            BrokerError::Receive("missed idle heartbeat".to_owned())
        );
        assert_eq!(inbound.next().await.unwrap().unwrap().payload(), b"after");
        assert!(inbound.next().await.is_none());
        assert_eq!(broker.pending("q").len(), 0);
        assert_eq!(broker.delivered("q"), 2);
    }

    #[tokio::test]
    async fn consumer_wakes_on_late_publication() {
        let broker = MemoryBroker::new();
        let mut inbound = broker.subscribe("q").await.unwrap();

        let producer = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer.inject("q", b"late".to_vec());
        });

        let delivery = inbound.next().await.unwrap().unwrap();
        assert_eq!(delivery.payload(), b"late");
    }

    #[tokio::test]
    async fn fanout_is_recorded_not_queued() {
        let broker = MemoryBroker::new();
        broker
            .publish(&Route::Fanout("everyone".to_owned()), b"state".to_vec())
            .await
            .unwrap();
        assert_eq!(broker.fanout_messages("everyone"), vec![b"state".to_vec()]);
        assert!(broker.pending("everyone").is_empty());
    }

    #[tokio::test]
    async fn rejected_publication_is_an_error() {
        let broker = MemoryBroker::new();
        broker.reject_publishes(true);
        let err = broker
            .publish(&Route::Queue("q".to_owned()), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Publish(_)));
        assert!(broker.pending("q").is_empty());
    }

    #[tokio::test]
    async fn purge_empties_and_reports() {
        let broker = MemoryBroker::new();
        broker.inject("q", b"a".to_vec());
        broker.inject("q", b"b".to_vec());
        assert_eq!(broker.purge("q").await.unwrap(), 2);
        assert_eq!(broker.purge("q").await.unwrap(), 0);
        assert_eq!(broker.purge("never_used").await.unwrap(), 0);
    }
}

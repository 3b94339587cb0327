//! Broker channel abstraction for the Skirmish combat engine.
//!
//! The engine and the evaluation relay only ever talk to each other, and to
//! the display and sensor nodes, through two kinds of channel:
//!
//! - **Durable queues** with a single consumer, in-order delivery and explicit
//!   acknowledgement (at-least-once).
//! - **Fan-out exchanges** where every subscriber receives every message.
//!
//! The [`Broker`] trait captures exactly that contract so the router and the
//! relay can be driven by the in-memory broker in tests and by NATS in
//! production.
//!
//! # Modules
//!
//! - [`nats`] -- [`NatsBroker`]: JetStream work-queue streams + core subjects
//! - [`memory`] -- [`MemoryBroker`]: in-process broker for tests
//! - [`channels`] -- [`ChannelNames`] loaded from the environment
//! - [`purge`] -- [`QueuePurgeBootstrap`] run before consumption starts
//! - [`error`] -- [`BrokerError`]

use core::future::Future;

pub mod channels;
pub mod error;
pub mod memory;
pub mod nats;
pub mod purge;

pub use channels::ChannelNames;
pub use error::BrokerError;
pub use memory::MemoryBroker;
pub use nats::NatsBroker;
pub use purge::{PurgeReport, QueuePurgeBootstrap};

/// Where a message is published.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// A durable queue consumed by exactly one consumer.
    Queue(String),
    /// A fan-out exchange delivering to every subscriber.
    Fanout(String),
}

impl Route {
    /// The queue or exchange name.
    pub fn name(&self) -> &str {
        match self {
            Self::Queue(name) | Self::Fanout(name) => name,
        }
    }
}

impl core::fmt::Display for Route {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Queue(name) => write!(f, "queue:{name}"),
            Self::Fanout(name) => write!(f, "fanout:{name}"),
        }
    }
}

/// A message broker offering durable queues and fan-out exchanges.
pub trait Broker: Send + Sync {
    /// Stream of deliveries from one queue.
    type Inbound: Inbound;

    /// Declare `queue` if needed and start consuming it.
    fn subscribe(
        &self,
        queue: &str,
    ) -> impl Future<Output = Result<Self::Inbound, BrokerError>> + Send;

    /// Publish `payload` to `route`. Queue publications are confirmed by the
    /// broker before this returns.
    fn publish(
        &self,
        route: &Route,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), BrokerError>> + Send;

    /// Declare `queue` if needed and drop every message in it, returning how
    /// many were dropped. Purging an empty queue is not an error.
    fn purge(&self, queue: &str) -> impl Future<Output = Result<u64, BrokerError>> + Send;
}

/// Deliveries from one subscribed queue, in order.
pub trait Inbound: Send {
    /// One message taken from the queue.
    type Delivery: Delivery;

    /// Wait for the next delivery. `None` means the subscription has ended.
    fn next(
        &mut self,
    ) -> impl Future<Output = Option<Result<Self::Delivery, BrokerError>>> + Send;
}

/// A message taken from a queue, pending acknowledgement.
///
/// Dropping a delivery without acknowledging it leaves it to the broker to
/// redeliver.
pub trait Delivery: Send {
    /// Raw message body.
    fn payload(&self) -> &[u8];

    /// Acknowledge the message so it is never redelivered.
    fn ack(self) -> impl Future<Output = Result<(), BrokerError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_display_names_the_kind() {
        assert_eq!(Route::Queue("a".to_owned()).to_string(), "queue:a");
        assert_eq!(Route::Fanout("b".to_owned()).to_string(), "fanout:b");
        assert_eq!(Route::Fanout("b".to_owned()).name(), "b");
    }
}

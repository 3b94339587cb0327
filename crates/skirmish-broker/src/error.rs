//! Error types for broker operations.
//!
//! Foreign errors from the NATS client are carried as strings with the failing
//! operation and channel already formatted in, so the variants stay cheap to
//! move and compare.

/// Errors that can occur while talking to the message broker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// A channel name or broker setting is invalid.
    #[error("broker config error: {0}")]
    Config(String),

    /// Failed to connect to the broker.
    #[error("broker connect error: {0}")]
    Connect(String),

    /// Failed to declare a queue or start consuming it.
    #[error("broker subscribe error: {0}")]
    Subscribe(String),

    /// Failed to receive the next delivery.
    #[error("broker receive error: {0}")]
    Receive(String),

    /// The broker did not accept or confirm a publication.
    #[error("broker publish error: {0}")]
    Publish(String),

    /// Failed to acknowledge a delivery.
    #[error("broker ack error: {0}")]
    Ack(String),

    /// Failed to purge a queue.
    #[error("broker purge error: {0}")]
    Purge(String),
}

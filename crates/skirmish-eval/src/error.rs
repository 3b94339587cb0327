//! Error types for the evaluation-server link and relay.

use std::time::Duration;

use skirmish_broker::BrokerError;

/// Errors on the encrypted link to the evaluation server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    /// The shared key is not exactly 16 bytes.
    #[error("secret key must be 16 bytes, got {0}")]
    InvalidKey(usize),

    /// A client frame could not be decrypted.
    #[error("cipher error: {0}")]
    Cipher(String),

    /// No reply arrived in time. The reply is still owed and will be drained
    /// before the next request.
    #[error("no reply within {0:?}")]
    Timeout(Duration),

    /// The server closed the connection between frames. The link reconnects
    /// on the next cycle.
    #[error("connection closed by server")]
    Closed,

    /// The byte stream no longer lines up with frame boundaries.
    #[error("framing error: {0}")]
    Framing(String),

    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A frame was read but its body is not the expected JSON.
    #[error("payload error: {0}")]
    Payload(String),
}

impl LinkError {
    /// Whether the relay has to stop.
    ///
    /// Only a stream that has lost its frame boundaries is fatal. Timeouts
    /// and bad payloads leave the stream aligned, and a lost connection is
    /// reopened on the next cycle.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Framing(_))
    }

    /// Whether the connection is gone and has to be reopened.
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Closed | Self::Io(_))
    }
}

/// Errors that stop the evaluation relay.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The link to the evaluation server failed.
    #[error("link error: {source}")]
    Link {
        /// The underlying link error.
        #[from]
        source: LinkError,
    },

    /// The broker failed in a way the relay cannot recover from.
    #[error("broker error: {source}")]
    Broker {
        /// The underlying broker error.
        #[from]
        source: BrokerError,
    },

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

//! Error types for the game engine.
//!
//! [`EngineError`] covers everything that can stop the router or the engine
//! binary. Per-message problems (invalid envelopes, guard rejections, failed
//! publications) are handled inside the router and never surface here.

use skirmish_broker::BrokerError;

/// Errors that stop the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The broker failed in a way the router cannot recover from.
    #[error("broker error: {source}")]
    Broker {
        /// The underlying broker error.
        #[from]
        source: BrokerError,
    },

    /// An outbound message could not be serialized.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

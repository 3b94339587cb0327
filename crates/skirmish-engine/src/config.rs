//! Configuration for the engine binary.
//!
//! All configuration is loaded from environment variables.

use skirmish_broker::ChannelNames;

use crate::error::EngineError;

/// Complete engine configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// NATS server URL (e.g. `nats://localhost:4222`).
    pub nats_url: String,
    /// Queue and exchange names.
    pub channels: ChannelNames,
    /// Empty the durable queues before consuming.
    pub purge_on_start: bool,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `NATS_URL` -- NATS server connection string (default `nats://localhost:4222`)
    /// - `PURGE_ON_START` -- purge the durable queues at startup (default `true`)
    /// - channel names, see [`ChannelNames::from_env`]
    pub fn from_env() -> Result<Self, EngineError> {
        let nats_url =
            std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_owned());

        let purge_on_start: bool = std::env::var("PURGE_ON_START")
            .unwrap_or_else(|_| "true".to_owned())
            .parse()
            .map_err(|e| EngineError::Config(format!("invalid PURGE_ON_START: {e}")))?;

        let channels = ChannelNames::from_env()
            .map_err(|e| EngineError::Config(format!("invalid channel names: {e}")))?;

        Ok(Self {
            nats_url,
            channels,
            purge_on_start,
        })
    }
}

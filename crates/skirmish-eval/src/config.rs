//! Configuration for the evaluation relay binary.
//!
//! All configuration is loaded from environment variables.

use std::time::Duration;

use skirmish_broker::ChannelNames;

use crate::crypto::{Cipher, KEY_LEN};
use crate::error::EvalError;

/// Complete relay configuration loaded from the environment.
#[derive(Clone)]
pub struct EvalConfig {
    /// NATS server URL (e.g. `nats://localhost:4222`).
    pub nats_url: String,
    /// Queue and exchange names.
    pub channels: ChannelNames,
    /// Evaluation server host name or address.
    pub eval_host: String,
    /// Evaluation server TCP port.
    pub eval_port: u16,
    /// Shared AES key, exactly 16 bytes.
    pub secret_key: String,
    /// How long to wait for each reply frame.
    pub read_timeout: Duration,
    /// How long to wait for the TCP connection.
    pub connect_timeout: Duration,
}

impl EvalConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `EVAL_PORT` -- evaluation server port
    /// - `EVAL_SECRET_KEY` -- shared key, exactly 16 bytes
    ///
    /// Optional variables:
    /// - `NATS_URL` -- NATS server connection string (default `nats://localhost:4222`)
    /// - `EVAL_HOST` -- evaluation server host (default `localhost`)
    /// - `EVAL_READ_TIMEOUT_MS` -- reply timeout (default 2000)
    /// - `EVAL_CONNECT_TIMEOUT_MS` -- connect timeout (default 5000)
    /// - channel names, see [`ChannelNames::from_env`]
    pub fn from_env() -> Result<Self, EvalError> {
        let nats_url =
            std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_owned());

        let eval_host = std::env::var("EVAL_HOST").unwrap_or_else(|_| "localhost".to_owned());

        let eval_port: u16 = env_var("EVAL_PORT")?
            .parse()
            .map_err(|e| EvalError::Config(format!("invalid EVAL_PORT: {e}")))?;

        let secret_key = env_var("EVAL_SECRET_KEY")?;

        let read_timeout = millis_var("EVAL_READ_TIMEOUT_MS", 2000)?;
        let connect_timeout = millis_var("EVAL_CONNECT_TIMEOUT_MS", 5000)?;

        let channels = ChannelNames::from_env()
            .map_err(|e| EvalError::Config(format!("invalid channel names: {e}")))?;

        let config = Self {
            nats_url,
            channels,
            eval_host,
            eval_port,
            secret_key,
            read_timeout,
            connect_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.secret_key.len() != KEY_LEN {
            return Err(EvalError::Config(format!(
                "EVAL_SECRET_KEY must be {KEY_LEN} bytes, got {}",
                self.secret_key.len()
            )));
        }
        if self.read_timeout.is_zero() {
            return Err(EvalError::Config(
                "EVAL_READ_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    /// Build the frame cipher from the shared key.
    pub fn cipher(&self) -> Result<Cipher, EvalError> {
        Ok(Cipher::new(self.secret_key.as_bytes())?)
    }
}

impl std::fmt::Debug for EvalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalConfig")
            .field("nats_url", &self.nats_url)
            .field("channels", &self.channels)
            .field("eval_host", &self.eval_host)
            .field("eval_port", &self.eval_port)
            .field("secret_key", &"<redacted>")
            .field("read_timeout", &self.read_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, EvalError> {
    std::env::var(name)
        .map_err(|e| EvalError::Config(format!("missing required env var {name}: {e}")))
}

fn millis_var(key: &str, default: u64) -> Result<Duration, EvalError> {
    let millis: u64 = std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|e| EvalError::Config(format!("invalid {key}: {e}")))?;
    Ok(Duration::from_millis(millis))
}

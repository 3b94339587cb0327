//! Named channels shared by the engine, the evaluation relay and the nodes.

use crate::Route;
use crate::error::BrokerError;

/// Default name of the game-engine inbound queue.
pub const DEFAULT_UPDATE_GE_QUEUE: &str = "update_ge_queue";
/// Default name of the evaluation-server outbound queue.
pub const DEFAULT_UPDATE_EVAL_SERVER_QUEUE: &str = "update_eval_server_queue";
/// Default name of the fan-out exchange read by every node.
pub const DEFAULT_UPDATE_EVERYONE_EXCHANGE: &str = "update_everyone_exchange";
/// Default name of the queue fed by the gesture classifier.
pub const DEFAULT_AI_QUEUE: &str = "ai_queue";

/// Names of every channel in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    /// Inbound queue consumed by the game engine.
    pub update_ge: String,
    /// Queue consumed by the evaluation relay.
    pub update_eval_server: String,
    /// Fan-out exchange for full-state broadcasts.
    pub update_everyone: String,
    /// Queue fed by the gesture classifier.
    pub ai: String,
}

impl Default for ChannelNames {
    fn default() -> Self {
        Self {
            update_ge: DEFAULT_UPDATE_GE_QUEUE.to_owned(),
            update_eval_server: DEFAULT_UPDATE_EVAL_SERVER_QUEUE.to_owned(),
            update_everyone: DEFAULT_UPDATE_EVERYONE_EXCHANGE.to_owned(),
            ai: DEFAULT_AI_QUEUE.to_owned(),
        }
    }
}

impl ChannelNames {
    /// Load channel names from the environment, falling back to the defaults.
    ///
    /// Optional variables:
    /// - `UPDATE_GE_QUEUE` (default `update_ge_queue`)
    /// - `UPDATE_EVAL_SERVER_QUEUE` (default `update_eval_server_queue`)
    /// - `UPDATE_EVERYONE_EXCHANGE` (default `update_everyone_exchange`)
    /// - `AI_QUEUE` (default `ai_queue`)
    ///
    /// Names must be non-empty and free of whitespace and `.`, `*`, `>`,
    /// which the broker reserves for subject hierarchies.
    pub fn from_env() -> Result<Self, BrokerError> {
        let names = Self {
            update_ge: channel_var("UPDATE_GE_QUEUE", DEFAULT_UPDATE_GE_QUEUE),
            update_eval_server: channel_var(
                "UPDATE_EVAL_SERVER_QUEUE",
                DEFAULT_UPDATE_EVAL_SERVER_QUEUE,
            ),
            update_everyone: channel_var(
                "UPDATE_EVERYONE_EXCHANGE",
                DEFAULT_UPDATE_EVERYONE_EXCHANGE,
            ),
            ai: channel_var("AI_QUEUE", DEFAULT_AI_QUEUE),
        };
        names.validate()?;
        Ok(names)
    }

    /// Reject names the broker cannot use as stream or subject names.
    pub fn validate(&self) -> Result<(), BrokerError> {
        for name in [
            &self.update_ge,
            &self.update_eval_server,
            &self.update_everyone,
            &self.ai,
        ] {
            let invalid = name.is_empty()
                || name
                    .chars()
                    .any(|c| c.is_whitespace() || matches!(c, '.' | '*' | '>'));
            if invalid {
                return Err(BrokerError::Config(format!("invalid channel name {name:?}")));
            }
        }
        Ok(())
    }

    /// Route to the game-engine inbound queue.
    pub fn engine_inbound(&self) -> Route {
        Route::Queue(self.update_ge.clone())
    }

    /// Route to the evaluation-server outbound queue.
    pub fn eval_outbound(&self) -> Route {
        Route::Queue(self.update_eval_server.clone())
    }

    /// Route to the everyone fan-out exchange.
    pub fn everyone(&self) -> Route {
        Route::Fanout(self.update_everyone.clone())
    }

    /// The durable queues emptied before a fresh match: inbound,
    /// eval-outbound and the classifier queue.
    pub fn purge_targets(&self) -> [&str; 3] {
        [
            self.update_ge.as_str(),
            self.update_eval_server.as_str(),
            self.ai.as_str(),
        ]
    }
}

fn channel_var(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

//! Game state engine for the Skirmish combat engine.
//!
//! Holds the one authoritative [`MatchState`] for a match and keeps it
//! consistent across every producer: the gesture classifier, the wearable
//! sensor nodes and the evaluation server's corrections all arrive as messages
//! on one inbound queue and are applied strictly one at a time.
//!
//! # Modules
//!
//! - [`engine`] -- [`GameStateEngine`]: merge, resolve, decide what to publish
//! - [`router`] -- [`MessageRouter`]: consume, apply, publish, acknowledge
//! - [`config`] -- [`EngineConfig`] loaded from the environment
//! - [`error`] -- [`EngineError`]
//!
//! [`MatchState`]: skirmish_types::MatchState

pub mod config;
pub mod engine;
pub mod error;
pub mod router;

pub use config::EngineConfig;
pub use engine::{GameStateEngine, Publications};
pub use error::EngineError;
pub use router::{MessageRouter, RouteOutcome, RouterStats};

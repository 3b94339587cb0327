//! Shared type definitions for the Skirmish combat engine.
//!
//! This crate is the single source of truth for the match state and for every
//! message shape that crosses a process boundary: the inbound envelope read
//! from the game-engine queue, the broadcasts published to display nodes, and
//! the plaintext exchanged with the evaluation server.
//!
//! # Modules
//!
//! - [`ids`] -- Player identifiers (`1` / `2` on the wire)
//! - [`enums`] -- Combat action types
//! - [`state`] -- [`PlayerState`], [`MatchState`] and their range limits
//! - [`fragment`] -- Partial state fragments merged field-by-field
//! - [`messages`] -- Inbound envelope, [`InboundEvent`], outbound broadcasts
//! - [`eval`] -- Evaluation-server request/response payloads
//! - [`error`] -- [`ValidationError`] for malformed inbound data

pub mod enums;
pub mod error;
pub mod eval;
pub mod fragment;
pub mod ids;
pub mod messages;
pub mod state;

// Re-export all public types at crate root for convenience.
pub use enums::ActionType;
pub use error::ValidationError;
pub use eval::{EvalRequest, MatchVitals, Vitals};
pub use fragment::{MatchFragment, PlayerFragment};
pub use ids::PlayerId;
pub use messages::{ActionPayload, InboundEvent, InboundMessage, ResolvedAction, StateBroadcast};
pub use state::{
    MatchState, PlayerState, INITIAL_BOMBS, INITIAL_SHIELDS, MAX_BOMBS, MAX_BULLETS, MAX_HP,
    MAX_SHIELDS, MAX_SHIELD_HP,
};

//! Combat resolution for the Skirmish combat engine.
//!
//! This crate is the pure rules layer: it mutates a [`MatchState`] for one
//! action and reports what happened, without touching I/O, clocks or the
//! broker. The engine crate decides what to publish from the returned
//! [`Resolution`].
//!
//! # Modules
//!
//! - [`damage`] -- Shield-first damage routine and in-pass revive
//! - [`resolver`] -- Action resolution ([`resolve`]) and its report
//! - [`error`] -- [`CombatError`] for guard rejections (login and per-action)
//!
//! [`MatchState`]: skirmish_types::MatchState

pub mod damage;
pub mod error;
pub mod resolver;

pub use damage::{DamageOutcome, apply_damage};
pub use error::CombatError;
pub use resolver::{
    BOMB_DAMAGE, GUN_DAMAGE, PASSES_PER_LIFE, RAIN_BOMB_DAMAGE, Resolution, SPORT_DAMAGE, resolve,
};

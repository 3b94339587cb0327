//! The single owner of the match state.
//!
//! [`GameStateEngine`] is the only thing that ever mutates the [`MatchState`].
//! Callers hand it one [`InboundEvent`] at a time and get back the messages
//! that should be published; they can read the state through
//! [`GameStateEngine::snapshot`] but never write to it.
//!
//! # Event handling
//!
//! Every event first merges its fragment. Then:
//!
//! - `Resolve` runs the resolver. A guard rejection publishes nothing and
//!   leaves the transient hit flags as they were; otherwise the state goes to
//!   both the evaluation queue and the fan-out exchange.
//! - `Broadcast` publishes the state to the fan-out exchange.
//! - `SilentMerge` publishes nothing.
//!
//! The publications capture the state (hit flags included) before both
//! players' transient flags are cleared for the next event.

use skirmish_combat::CombatError;
use skirmish_types::{
    ActionPayload, InboundEvent, MatchFragment, MatchState, ResolvedAction, StateBroadcast,
};
use tracing::{debug, trace};

/// Messages to publish after handling one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Publications {
    /// State sent to the evaluation server (action path only).
    pub eval: Option<ResolvedAction>,
    /// State broadcast to every node.
    pub broadcast: Option<StateBroadcast>,
}

impl Publications {
    /// Nothing to publish.
    pub const fn none() -> Self {
        Self {
            eval: None,
            broadcast: None,
        }
    }

    /// Number of messages to publish.
    pub const fn len(&self) -> usize {
        match (&self.eval, &self.broadcast) {
            (Some(_), Some(_)) => 2,
            (Some(_), None) | (None, Some(_)) => 1,
            (None, None) => 0,
        }
    }

    /// Whether there is nothing to publish.
    pub const fn is_empty(&self) -> bool {
        self.eval.is_none() && self.broadcast.is_none()
    }
}

/// Owns the match state and applies inbound events to it.
#[derive(Debug, Clone, Default)]
pub struct GameStateEngine {
    state: MatchState,
}

impl GameStateEngine {
    /// Start a fresh match.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from an existing state.
    pub const fn with_state(state: MatchState) -> Self {
        Self { state }
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> MatchState {
        self.state.clone()
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Returns the resolver's [`CombatError`] when an action is rejected by a
    /// guard. The event's fragment has still been merged.
    pub fn apply(&mut self, event: InboundEvent) -> Result<Publications, CombatError> {
        let publications = match event {
            InboundEvent::Resolve(payload) => self.resolve(payload)?,
            InboundEvent::Broadcast(fragment) => {
                self.merge(&fragment);
                Publications {
                    eval: None,
                    broadcast: Some(StateBroadcast::after_update(self.state.clone())),
                }
            }
            InboundEvent::SilentMerge(fragment) => {
                self.merge(&fragment);
                trace!(state = ?self.state, "merged without publishing");
                Publications::none()
            }
        };
        self.state.clear_transient();
        Ok(publications)
    }

    fn merge(&mut self, fragment: &MatchFragment) {
        if !fragment.is_empty() {
            fragment.merge_into(&mut self.state);
        }
    }

    fn resolve(&mut self, payload: ActionPayload) -> Result<Publications, CombatError> {
        let ActionPayload {
            player_id,
            action_type,
            hit,
            fragment,
        } = payload;
        self.merge(&fragment);

        let resolution = skirmish_combat::resolve(&mut self.state, player_id, action_type, hit)?;
        debug!(
            player = %player_id,
            action = %action_type,
            hit = hit,
            rain_bomb_ticks = resolution.rain_bomb_ticks,
            opponent_hit = resolution.opponent_hit,
            opponent_shield_hit = resolution.opponent_shield_hit,
            revives = resolution.revives,
            "action resolved"
        );

        Ok(Publications {
            eval: Some(ResolvedAction {
                game_state: self.state.clone(),
                action: action_type,
                player_id,
            }),
            broadcast: Some(StateBroadcast::after_action(
                self.state.clone(),
                player_id,
                action_type,
            )),
        })
    }
}

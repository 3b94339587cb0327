//! Messages exchanged over the broker.
//!
//! Every producer writes the same envelope ([`InboundMessage`]) to the
//! game-engine queue, using two flags to say what it wants done. At the edge
//! the envelope is turned into an explicit [`InboundEvent`] so that the rest
//! of the engine never has to interpret flag combinations.
//!
//! | `action` | `update` | event |
//! |---|---|---|
//! | `true` | any | [`InboundEvent::Resolve`] |
//! | `false` | `true` | [`InboundEvent::Broadcast`] |
//! | `false` | `false` | [`InboundEvent::SilentMerge`] |

use serde::{Deserialize, Serialize};

use crate::enums::ActionType;
use crate::error::ValidationError;
use crate::eval::MatchVitals;
use crate::fragment::MatchFragment;
use crate::ids::PlayerId;
use crate::state::MatchState;

/// The envelope read from the game-engine queue.
///
/// All fields are optional on the wire and default to `false` / empty.
/// `player_id` and `action_type` are kept loosely typed here and validated in
/// [`InboundMessage::into_event`], so an update that happens to carry a stale
/// action name is still merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundMessage {
    /// Resolve a combat action.
    pub action: bool,
    /// Broadcast the state after merging.
    pub update: bool,
    /// Acting player (`1` or `2`); required when `action` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<i64>,
    /// Action name; required when `action` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    /// Whether a gun shot hit the opponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit: Option<bool>,
    /// State fragment to merge.
    pub game_state: MatchFragment,
}

impl InboundMessage {
    /// Parse an envelope from raw message bytes.
    pub fn from_slice(payload: &[u8]) -> Result<Self, ValidationError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// An update envelope carrying the evaluation server's authoritative
    /// vitals, to be merged and broadcast by the engine.
    pub fn correction(vitals: MatchVitals) -> Self {
        Self {
            update: true,
            game_state: vitals.into(),
            ..Self::default()
        }
    }

    /// Validate the envelope and decide what kind of event it is.
    pub fn into_event(self) -> Result<InboundEvent, ValidationError> {
        if self.action {
            let player_id = self
                .player_id
                .ok_or(ValidationError::MissingField("player_id"))
                .and_then(PlayerId::try_from)?;
            let action_type = self
                .action_type
                .ok_or(ValidationError::MissingField("action_type"))?
                .parse::<ActionType>()?;
            Ok(InboundEvent::Resolve(ActionPayload {
                player_id,
                action_type,
                hit: self.hit.unwrap_or(false),
                fragment: self.game_state,
            }))
        } else if self.update {
            Ok(InboundEvent::Broadcast(self.game_state))
        } else {
            Ok(InboundEvent::SilentMerge(self.game_state))
        }
    }
}

/// A validated action to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPayload {
    /// Acting player.
    pub player_id: PlayerId,
    /// The action performed.
    pub action_type: ActionType,
    /// Whether a gun shot hit (ignored for other actions).
    pub hit: bool,
    /// Fragment merged before the action is resolved.
    pub fragment: MatchFragment,
}

/// What the engine has been asked to do with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Merge the fragment, resolve the action, publish to everyone and to the
    /// evaluation server.
    Resolve(ActionPayload),
    /// Merge the fragment and publish the full state to everyone.
    Broadcast(MatchFragment),
    /// Merge the fragment without publishing anything.
    SilentMerge(MatchFragment),
}

impl InboundEvent {
    /// Short label for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Resolve(_) => "resolve",
            Self::Broadcast(_) => "broadcast",
            Self::SilentMerge(_) => "silent_merge",
        }
    }
}

/// The full-state message published on the fan-out exchange.
///
/// On the action path it names the action and the actor; on the update path
/// it carries the state alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBroadcast {
    /// Full match state after the event.
    pub game_state: MatchState,
    /// Resolved action, when the broadcast follows an action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionType>,
    /// Acting player, when the broadcast follows an action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
}

impl StateBroadcast {
    /// Broadcast following a resolved action.
    pub const fn after_action(
        game_state: MatchState,
        player_id: PlayerId,
        action: ActionType,
    ) -> Self {
        Self {
            game_state,
            action: Some(action),
            player_id: Some(player_id),
        }
    }

    /// Broadcast following a merge-only update.
    pub const fn after_update(game_state: MatchState) -> Self {
        Self {
            game_state,
            action: None,
            player_id: None,
        }
    }
}

/// The message published to the evaluation-server queue for every resolved
/// action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAction {
    /// Full match state after resolution.
    pub game_state: MatchState,
    /// The resolved action.
    pub action: ActionType,
    /// Acting player.
    pub player_id: PlayerId,
}

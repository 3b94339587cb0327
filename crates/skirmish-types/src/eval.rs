//! Evaluation-server payloads.
//!
//! The evaluation server only deals in vitals: it receives the action and the
//! engine's view of both players, and answers with its own authoritative
//! vitals. Sensor flags and transient hit flags never cross this boundary.

use serde::{Deserialize, Serialize};

use crate::enums::ActionType;
use crate::fragment::{MatchFragment, PlayerFragment};
use crate::ids::PlayerId;
use crate::state::{MatchState, PlayerState};

/// The vitals of one player as exchanged with the evaluation server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    /// Hit points.
    pub hp: u32,
    /// Bullets in the magazine.
    pub bullets: u32,
    /// Bombs left.
    pub bombs: u32,
    /// Active shield hit points.
    pub shield_hp: u32,
    /// Death count.
    pub deaths: u32,
    /// Shields left.
    pub shields: u32,
}

impl From<&PlayerState> for Vitals {
    fn from(player: &PlayerState) -> Self {
        Self {
            hp: player.hp,
            bullets: player.bullets,
            bombs: player.bombs,
            shield_hp: player.shield_hp,
            deaths: player.deaths,
            shields: player.shields,
        }
    }
}

impl From<Vitals> for PlayerFragment {
    fn from(vitals: Vitals) -> Self {
        Self {
            hp: Some(vitals.hp),
            bullets: Some(vitals.bullets),
            bombs: Some(vitals.bombs),
            shield_hp: Some(vitals.shield_hp),
            deaths: Some(vitals.deaths),
            shields: Some(vitals.shields),
            ..Self::default()
        }
    }
}

/// Both players' vitals. This is also the shape of the server's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchVitals {
    /// Player 1.
    pub p1: Vitals,
    /// Player 2.
    pub p2: Vitals,
}

impl From<&MatchState> for MatchVitals {
    fn from(state: &MatchState) -> Self {
        Self {
            p1: Vitals::from(&state.p1),
            p2: Vitals::from(&state.p2),
        }
    }
}

impl From<MatchVitals> for MatchFragment {
    fn from(vitals: MatchVitals) -> Self {
        Self {
            p1: Some(vitals.p1.into()),
            p2: Some(vitals.p2.into()),
        }
    }
}

/// The plaintext request sent to the evaluation server for one action.
///
/// Deserializing a resolved-action message straight into this type drops
/// every non-vital field, which is exactly the projection the server expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalRequest {
    /// The acting player.
    pub player_id: PlayerId,
    /// The resolved action.
    pub action: ActionType,
    /// Vitals of both players after resolution.
    pub game_state: MatchVitals,
}

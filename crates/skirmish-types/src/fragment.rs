//! Partial state fragments.
//!
//! Sensor nodes, the gesture pipeline and the evaluation server each know
//! only a slice of the match state. They send a [`MatchFragment`] whose
//! fields are all optional; merging writes exactly the fields that are
//! present and leaves everything else untouched.
//!
//! Numeric fields are clamped into their documented ranges as they are
//! merged, so a correction from outside can never push the authoritative
//! state out of range. Merging the same fragment twice is the same as
//! merging it once.

use serde::{Deserialize, Serialize};

use crate::state::{
    MAX_BOMBS, MAX_BULLETS, MAX_HP, MAX_SHIELDS, MAX_SHIELD_HP, MatchState, PlayerState,
};

/// A partial update for one player. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerFragment {
    /// Hit points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
    /// Bullets in the magazine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullets: Option<u32>,
    /// Bombs left.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bombs: Option<u32>,
    /// Active shield hit points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shield_hp: Option<u32>,
    /// Death count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaths: Option<u32>,
    /// Shields left.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shields: Option<u32>,
    /// Transient: last action damaged the opponent's hit points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_hit: Option<bool>,
    /// Transient: last action damaged the opponent's shield.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_shield_hit: Option<bool>,
    /// Opponent in line of sight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_visible: Option<bool>,
    /// Rain bombs the opponent is standing in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_in_rain_bomb: Option<u32>,
    /// Glove sensor node connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glove_connected: Option<bool>,
    /// Vest sensor node connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vest_connected: Option<bool>,
    /// Leg sensor node connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leg_connected: Option<bool>,
    /// Player reported as disconnected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnected: Option<bool>,
    /// Login flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<bool>,
}

impl PlayerFragment {
    /// Whether the fragment carries no fields at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write every present field into `player`.
    pub fn merge_into(&self, player: &mut PlayerState) {
        if let Some(hp) = self.hp {
            player.hp = hp.min(MAX_HP);
        }
        if let Some(bullets) = self.bullets {
            player.bullets = bullets.min(MAX_BULLETS);
        }
        if let Some(bombs) = self.bombs {
            player.bombs = bombs.min(MAX_BOMBS);
        }
        if let Some(shield_hp) = self.shield_hp {
            player.shield_hp = shield_hp.min(MAX_SHIELD_HP);
        }
        if let Some(deaths) = self.deaths {
            player.deaths = deaths;
        }
        if let Some(shields) = self.shields {
            player.shields = shields.min(MAX_SHIELDS);
        }
        if let Some(hit) = self.opponent_hit {
            player.opponent_hit = hit;
        }
        if let Some(shield_hit) = self.opponent_shield_hit {
            player.opponent_shield_hit = shield_hit;
        }
        if let Some(visible) = self.opponent_visible {
            player.opponent_visible = visible;
        }
        if let Some(rain_bombs) = self.opponent_in_rain_bomb {
            player.opponent_in_rain_bomb = rain_bombs;
        }
        if let Some(connected) = self.glove_connected {
            player.glove_connected = connected;
        }
        if let Some(connected) = self.vest_connected {
            player.vest_connected = connected;
        }
        if let Some(connected) = self.leg_connected {
            player.leg_connected = connected;
        }
        if let Some(disconnected) = self.disconnected {
            player.disconnected = disconnected;
        }
        if let Some(login) = self.login {
            player.login = login;
        }
    }
}

/// A partial update for the match. Either player may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchFragment {
    /// Fields for player 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p1: Option<PlayerFragment>,
    /// Fields for player 2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p2: Option<PlayerFragment>,
}

impl MatchFragment {
    /// Whether merging this fragment would change nothing.
    pub fn is_empty(&self) -> bool {
        self.p1.as_ref().is_none_or(PlayerFragment::is_empty)
            && self.p2.as_ref().is_none_or(PlayerFragment::is_empty)
    }

    /// Write every present field of both players into `state`.
    pub fn merge_into(&self, state: &mut MatchState) {
        if let Some(p1) = &self.p1 {
            p1.merge_into(&mut state.p1);
        }
        if let Some(p2) = &self.p2 {
            p2.merge_into(&mut state.p2);
        }
    }
}

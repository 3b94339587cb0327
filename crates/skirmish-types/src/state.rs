//! Authoritative match state.
//!
//! [`MatchState`] holds the combined vitals of both players. The engine owns
//! exactly one instance and is its only writer; everything else sees clones.

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;

/// Maximum (and respawn) hit points.
pub const MAX_HP: u32 = 100;

/// Magazine size; also the respawn bullet count.
pub const MAX_BULLETS: u32 = 6;

/// Maximum bombs carried.
pub const MAX_BOMBS: u32 = 2;

/// Bombs at match start and after a revive.
pub const INITIAL_BOMBS: u32 = MAX_BOMBS;

/// Hit points of a freshly raised shield.
pub const MAX_SHIELD_HP: u32 = 30;

/// Maximum shields carried.
pub const MAX_SHIELDS: u32 = 3;

/// Shields at match start and after a revive.
pub const INITIAL_SHIELDS: u32 = MAX_SHIELDS;

/// Vitals and sensor flags for a single player.
///
/// `opponent_hit` and `opponent_shield_hit` are transient: they describe the
/// outcome of the most recent resolution so displays can animate it, and the
/// engine clears them after every publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Hit points (0--100).
    pub hp: u32,
    /// Bullets left in the magazine (0--6).
    pub bullets: u32,
    /// Bombs left (0--2).
    pub bombs: u32,
    /// Remaining hit points of the active shield (0--30).
    pub shield_hp: u32,
    /// Number of times this player has been revived.
    pub deaths: u32,
    /// Shields left to raise (0--3).
    pub shields: u32,
    /// This player's last action damaged the opponent's hit points.
    pub opponent_hit: bool,
    /// This player's last action damaged the opponent's shield.
    pub opponent_shield_hit: bool,
    /// The opponent is currently in this player's line of sight.
    pub opponent_visible: bool,
    /// Number of rain bombs the opponent is standing in.
    pub opponent_in_rain_bomb: u32,
    /// Glove sensor node connected.
    pub glove_connected: bool,
    /// Vest sensor node connected.
    pub vest_connected: bool,
    /// Leg sensor node connected.
    pub leg_connected: bool,
    /// Player reported as disconnected by the relay node.
    pub disconnected: bool,
    /// Player is logged in. Actions resolve only while both players are.
    pub login: bool,
}

impl PlayerState {
    /// Reset vitals after hit points reached zero.
    ///
    /// Counts the death and restores full hit points, shields, bullets and
    /// bombs. The active shield is dropped.
    pub const fn revive(&mut self) {
        self.hp = MAX_HP;
        self.deaths = self.deaths.saturating_add(1);
        self.shields = INITIAL_SHIELDS;
        self.shield_hp = 0;
        self.bullets = MAX_BULLETS;
        self.bombs = INITIAL_BOMBS;
    }

    /// Clear the per-resolution hit flags.
    pub const fn clear_transient(&mut self) {
        self.opponent_hit = false;
        self.opponent_shield_hit = false;
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            hp: MAX_HP,
            bullets: MAX_BULLETS,
            bombs: INITIAL_BOMBS,
            shield_hp: 0,
            deaths: 0,
            shields: INITIAL_SHIELDS,
            opponent_hit: false,
            opponent_shield_hit: false,
            opponent_visible: true,
            opponent_in_rain_bomb: 0,
            glove_connected: false,
            vest_connected: false,
            leg_connected: false,
            disconnected: false,
            login: true,
        }
    }
}

/// The full state of the match: both players' vitals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Player 1.
    pub p1: PlayerState,
    /// Player 2.
    pub p2: PlayerState,
}

impl MatchState {
    /// Borrow one player's state.
    pub const fn player(&self, id: PlayerId) -> &PlayerState {
        match id {
            PlayerId::One => &self.p1,
            PlayerId::Two => &self.p2,
        }
    }

    /// Mutably borrow one player's state.
    pub const fn player_mut(&mut self, id: PlayerId) -> &mut PlayerState {
        match id {
            PlayerId::One => &mut self.p1,
            PlayerId::Two => &mut self.p2,
        }
    }

    /// Mutably borrow the actor and the opponent at the same time.
    pub const fn actor_and_opponent(
        &mut self,
        actor: PlayerId,
    ) -> (&mut PlayerState, &mut PlayerState) {
        match actor {
            PlayerId::One => (&mut self.p1, &mut self.p2),
            PlayerId::Two => (&mut self.p2, &mut self.p1),
        }
    }

    /// Both players are logged in.
    pub const fn both_logged_in(&self) -> bool {
        self.p1.login && self.p2.login
    }

    /// Clear both players' transient hit flags.
    pub const fn clear_transient(&mut self) {
        self.p1.clear_transient();
        self.p2.clear_transient();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_matches_match_start() {
        let player = PlayerState::default();
        assert_eq!(player.hp, 100);
        assert_eq!(player.bullets, 6);
        assert_eq!(player.bombs, 2);
        assert_eq!(player.shield_hp, 0);
        assert_eq!(player.shields, 3);
        assert_eq!(player.deaths, 0);
        assert!(player.opponent_visible);
        assert!(player.login);
        assert!(!player.glove_connected);
    }

    #[test]
    fn revive_restores_vitals_and_counts_death() {
        let mut player = PlayerState {
            hp: 0,
            bullets: 1,
            bombs: 0,
            shield_hp: 12,
            shields: 0,
            deaths: 4,
            ..PlayerState::default()
        };
        player.revive();
        assert_eq!(player.hp, MAX_HP);
        assert_eq!(player.deaths, 5);
        assert_eq!(player.shields, 3);
        assert_eq!(player.shield_hp, 0);
        assert_eq!(player.bullets, 6);
        assert_eq!(player.bombs, 2);
    }

    #[test]
    fn actor_and_opponent_are_distinct_players() {
        let mut state = MatchState::default();
        let (actor, opponent) = state.actor_and_opponent(PlayerId::Two);
        actor.bullets = 1;
        opponent.bullets = 4;
        assert_eq!(state.p2.bullets, 1);
        assert_eq!(state.p1.bullets, 4);
    }

    #[test]
    fn full_state_serializes_with_player_keys() {
        let json = serde_json::to_value(MatchState::default()).unwrap();
        assert_eq!(json["p1"]["hp"], 100);
        assert_eq!(json["p2"]["opponent_in_rain_bomb"], 0);
        assert_eq!(json["p2"]["login"], true);
    }
}

//! Action resolution.
//!
//! [`resolve`] applies one action to the match state in a fixed order:
//!
//! 1. Guards: both players logged in, and the action's own precondition
//!    (reload needs an empty magazine, shield needs one in stock and none
//!    active, bomb needs one in stock and a visible opponent). A failed guard
//!    returns [`CombatError`] before anything is mutated.
//! 2. Rain-bomb tick: while the opponent is visible, every rain bomb they
//!    stand in deals [`RAIN_BOMB_DAMAGE`], one damage pass per bomb.
//! 3. The action's primary effect.
//! 4. The actor's hit flags are set to the OR of every damage pass.
//!
//! Each damage pass may revive the opponent, so a large rain-bomb count can
//! revive them more than once within one resolution. Every life after the
//! first revive starts at full hp with no shield and lasts exactly
//! [`PASSES_PER_LIFE`] passes, so those lives are counted rather than
//! played out pass by pass.

use skirmish_types::{
    ActionType, MAX_BULLETS, MAX_HP, MAX_SHIELD_HP, MatchState, PlayerId, PlayerState,
};

use crate::damage::{DamageOutcome, apply_damage};
use crate::error::CombatError;

/// Damage of a gun shot that hit.
pub const GUN_DAMAGE: u32 = 5;

/// Damage of a thrown bomb.
pub const BOMB_DAMAGE: u32 = 5;

/// Damage dealt per rain bomb on every resolution tick.
pub const RAIN_BOMB_DAMAGE: u32 = 5;

/// Rain-bomb passes that take a freshly revived player from full hp to the
/// next revive.
pub const PASSES_PER_LIFE: u32 = MAX_HP.div_ceil(RAIN_BOMB_DAMAGE);

/// Damage of a sport attack (basket, volley, soccer, bowl).
pub const SPORT_DAMAGE: u32 = 10;

/// What one resolution did, for logging and publication decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The acting player.
    pub actor: PlayerId,
    /// The resolved action.
    pub action: ActionType,
    /// Number of rain-bomb damage passes applied before the action.
    pub rain_bomb_ticks: u32,
    /// Damage requested by the primary effect (before shield absorption).
    pub primary_damage: u32,
    /// Some damage reached the opponent's hit points.
    pub opponent_hit: bool,
    /// Some damage was absorbed by the opponent's shield.
    pub opponent_shield_hit: bool,
    /// Times the opponent was revived during this resolution.
    pub revives: u32,
}

impl Resolution {
    fn absorb(&mut self, outcome: DamageOutcome) {
        self.opponent_hit |= outcome.player_hit();
        self.opponent_shield_hit |= outcome.shield_hit();
        if outcome.revived {
            self.revives = self.revives.saturating_add(1);
        }
    }
}

/// Resolve `action` performed by `actor` against the current match state.
///
/// `hit` only matters for [`ActionType::Gun`]. On error the state is
/// unchanged.
pub fn resolve(
    state: &mut MatchState,
    actor: PlayerId,
    action: ActionType,
    hit: bool,
) -> Result<Resolution, CombatError> {
    if !state.both_logged_in() {
        return Err(CombatError::NotLoggedIn {
            p1_login: state.p1.login,
            p2_login: state.p2.login,
        });
    }

    let (player, opponent) = state.actor_and_opponent(actor);
    check_precondition(player, action)?;

    let mut resolution = Resolution {
        actor,
        action,
        rain_bomb_ticks: 0,
        primary_damage: 0,
        opponent_hit: false,
        opponent_shield_hit: false,
        revives: 0,
    };

    if player.opponent_visible {
        rain_bomb_passes(opponent, player.opponent_in_rain_bomb, &mut resolution);
    }

    // Zero damage still runs the pass, so an opponent left at 0 hp by a
    // merge is revived here.
    resolution.primary_damage = primary_effect(player, action, hit);
    resolution.absorb(apply_damage(opponent, resolution.primary_damage));

    player.opponent_hit = resolution.opponent_hit;
    player.opponent_shield_hit = resolution.opponent_shield_hit;

    Ok(resolution)
}

/// Apply `passes` rain-bomb damage passes to `opponent`.
fn rain_bomb_passes(opponent: &mut PlayerState, passes: u32, resolution: &mut Resolution) {
    let mut remaining = passes;
    while remaining > 0 && resolution.revives == 0 {
        resolution.absorb(apply_damage(opponent, RAIN_BOMB_DAMAGE));
        remaining = remaining.saturating_sub(1);
    }

    let lives = remaining.checked_div(PASSES_PER_LIFE).unwrap_or(0);
    if lives > 0 {
        opponent.deaths = opponent.deaths.saturating_add(lives);
        resolution.revives = resolution.revives.saturating_add(lives);
        resolution.opponent_hit = true;
    }
    for _ in 0..remaining.checked_rem(PASSES_PER_LIFE).unwrap_or(0) {
        resolution.absorb(apply_damage(opponent, RAIN_BOMB_DAMAGE));
    }

    resolution.rain_bomb_ticks = passes;
}

/// Reject actions whose own requirements are not met.
const fn check_precondition(player: &PlayerState, action: ActionType) -> Result<(), CombatError> {
    match action {
        ActionType::Reload if player.bullets > 0 => Err(CombatError::BulletsRemaining {
            bullets: player.bullets,
        }),
        ActionType::Shield if player.shield_hp > 0 => Err(CombatError::ShieldActive {
            shield_hp: player.shield_hp,
        }),
        ActionType::Shield if player.shields == 0 => Err(CombatError::NoShields),
        ActionType::Bomb if player.bombs == 0 => Err(CombatError::NoBombs),
        ActionType::Bomb if !player.opponent_visible => {
            Err(CombatError::OpponentNotVisible { action })
        }
        _ => Ok(()),
    }
}

/// Apply the actor's side of the action and return the damage it deals.
const fn primary_effect(player: &mut PlayerState, action: ActionType, hit: bool) -> u32 {
    match action {
        ActionType::Gun => {
            if player.bullets == 0 {
                return 0;
            }
            player.bullets = player.bullets.saturating_sub(1);
            if hit { GUN_DAMAGE } else { 0 }
        }
        ActionType::Bomb => {
            player.bombs = player.bombs.saturating_sub(1);
            BOMB_DAMAGE
        }
        ActionType::Reload => {
            player.bullets = MAX_BULLETS;
            0
        }
        ActionType::Shield => {
            player.shields = player.shields.saturating_sub(1);
            player.shield_hp = MAX_SHIELD_HP;
            0
        }
        // Sets login, not clears it. See `logout_sets_login_true`.
        ActionType::Logout => {
            player.login = true;
            0
        }
        ActionType::Basket | ActionType::Volley | ActionType::Soccer | ActionType::Bowl => {
            if player.opponent_visible { SPORT_DAMAGE } else { 0 }
        }
    }
}

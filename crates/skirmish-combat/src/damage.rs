//! Shield-first damage routine.
//!
//! Incoming damage is absorbed by the active shield first; whatever the
//! shield cannot take comes off hit points, floored at zero. A player whose
//! hit points reach zero is revived in the same call, so callers never observe
//! a dead player.

use skirmish_types::PlayerState;

/// What a single application of damage did to a player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Damage absorbed by the shield.
    pub shield_damage: u32,
    /// Damage that reached hit points.
    pub hp_damage: u32,
    /// The player died and was revived.
    pub revived: bool,
}

impl DamageOutcome {
    /// Some damage got past the shield.
    pub const fn player_hit(&self) -> bool {
        self.hp_damage > 0
    }

    /// The shield absorbed some damage.
    pub const fn shield_hit(&self) -> bool {
        self.shield_damage > 0
    }
}

/// Apply `damage` to `player`, shield first, reviving on zero hit points.
///
/// # Order of operations
///
/// 1. `to_shield = min(damage, shield_hp)`; subtract it from the shield
/// 2. Subtract the remainder from hit points, floored at 0
/// 3. If hit points are 0, revive (this also applies to zero damage on a
///    player whose hit points were already 0)
pub fn apply_damage(player: &mut PlayerState, damage: u32) -> DamageOutcome {
    let shield_damage = damage.min(player.shield_hp);
    player.shield_hp = player.shield_hp.saturating_sub(shield_damage);

    let hp_damage = damage.saturating_sub(shield_damage);
    player.hp = player.hp.saturating_sub(hp_damage);

    let revived = player.hp == 0;
    if revived {
        player.revive();
    }

    DamageOutcome {
        shield_damage,
        hp_damage,
        revived,
    }
}

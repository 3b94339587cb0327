//! Error types for combat resolution.

use skirmish_types::ActionType;

/// The resolver refused to resolve an action.
///
/// Every variant is a guard rejection: the match state is left untouched and
/// nothing is published. The router acknowledges and drops the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    /// Actions only resolve while both players are logged in.
    #[error("both players must be logged in (p1: {p1_login}, p2: {p2_login})")]
    NotLoggedIn {
        /// Player 1's login flag.
        p1_login: bool,
        /// Player 2's login flag.
        p2_login: bool,
    },

    /// Reload requires an empty magazine.
    #[error("cannot reload with {bullets} bullets left")]
    BulletsRemaining {
        /// Bullets still in the magazine.
        bullets: u32,
    },

    /// A shield is already up.
    #[error("shield already active ({shield_hp} hp left)")]
    ShieldActive {
        /// Hit points left on the active shield.
        shield_hp: u32,
    },

    /// No shields left to raise.
    #[error("no shields left")]
    NoShields,

    /// No bombs left to throw.
    #[error("no bombs left")]
    NoBombs,

    /// The action needs the opponent in sight.
    #[error("{action} needs a visible opponent")]
    OpponentNotVisible {
        /// The rejected action.
        action: ActionType,
    },
}

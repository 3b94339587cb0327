//! Combat action types.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An action a player can perform, as reported by the gesture classifier or
/// the sensor nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Fire one bullet. Damages the opponent only when the shot hit.
    Gun,
    /// Throw a bomb at a visible opponent.
    Bomb,
    /// Refill bullets; only possible with an empty magazine.
    Reload,
    /// Raise a fresh shield.
    Shield,
    /// Logout gesture.
    Logout,
    /// Basketball throw (sport attack).
    Basket,
    /// Volleyball spike (sport attack).
    Volley,
    /// Soccer kick (sport attack).
    Soccer,
    /// Bowling throw (sport attack).
    Bowl,
}

impl ActionType {
    /// Every action type, in wire order.
    pub const ALL: [Self; 9] = [
        Self::Gun,
        Self::Bomb,
        Self::Reload,
        Self::Shield,
        Self::Logout,
        Self::Basket,
        Self::Volley,
        Self::Soccer,
        Self::Bowl,
    ];

    /// The wire name of the action.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gun => "gun",
            Self::Bomb => "bomb",
            Self::Reload => "reload",
            Self::Shield => "shield",
            Self::Logout => "logout",
            Self::Basket => "basket",
            Self::Volley => "volley",
            Self::Soccer => "soccer",
            Self::Bowl => "bowl",
        }
    }

    /// Whether this is one of the sport attacks (basket, volley, soccer, bowl).
    pub const fn is_sport(self) -> bool {
        matches!(self, Self::Basket | Self::Volley | Self::Soccer | Self::Bowl)
    }
}

impl FromStr for ActionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownAction(s.to_owned()))
    }
}

impl core::fmt::Display for ActionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_wire_name() {
        for action in ActionType::ALL {
            assert_eq!(action.as_str().parse::<ActionType>().unwrap(), action);
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn unknown_action_is_a_validation_error() {
        let err = "dance".parse::<ActionType>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownAction(ref name) if name == "dance"));
    }

    #[test]
    fn sport_actions() {
        let sports: Vec<ActionType> =
            ActionType::ALL.into_iter().filter(|a| a.is_sport()).collect();
        assert_eq!(
            sports,
            vec![ActionType::Basket, ActionType::Volley, ActionType::Soccer, ActionType::Bowl]
        );
    }
}

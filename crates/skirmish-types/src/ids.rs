//! Player identifiers.
//!
//! A match has exactly two players. On the wire they are the integers `1` and
//! `2`; inside the state they are keyed `p1` and `p2`.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One of the two players in the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerId {
    /// Player 1 (`p1`).
    One,
    /// Player 2 (`p2`).
    Two,
}

impl PlayerId {
    /// The other player.
    pub const fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// The state key used for this player (`p1` or `p2`).
    pub const fn key(self) -> &'static str {
        match self {
            Self::One => "p1",
            Self::Two => "p2",
        }
    }

    /// The wire number of this player.
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl TryFrom<u8> for PlayerId {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(ValidationError::InvalidPlayer(i64::from(other))),
        }
    }
}

impl TryFrom<i64> for PlayerId {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_out_of_range| ValidationError::InvalidPlayer(value))
            .and_then(Self::try_from)
    }
}

impl From<PlayerId> for u8 {
    fn from(id: PlayerId) -> Self {
        id.number()
    }
}

impl core::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.key())
    }
}

//! Organizational role of a member.
//!
//! A person holds exactly one [`Position`] at a time. The database keeps the
//! historical five boolean columns ([`RoleFlags`]); converting flags back into
//! a position fails unless exactly one of them is set.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// The five mutually exclusive roles in the association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Regular member. Every new person starts here.
    #[default]
    Member,
    Secretary,
    Treasurer,
    President,
    /// No longer active in the association.
    Inactive,
}

impl Position {
    /// All positions, in display order.
    pub const ALL: [Self; 5] = [
        Self::Member,
        Self::Secretary,
        Self::Treasurer,
        Self::President,
        Self::Inactive,
    ];

    /// Machine name, as used in URLs, forms and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Secretary => "secretary",
            Self::Treasurer => "treasurer",
            Self::President => "president",
            Self::Inactive => "inactive",
        }
    }

    /// Label shown to members.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Member => "Membre",
            Self::Secretary => "Secrétaire",
            Self::Treasurer => "Trésorier",
            Self::President => "Président",
            Self::Inactive => "Inactif",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown position name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role '{0}' (expected member, secretary, treasurer, president or inactive)")]
pub struct PositionParseError(pub String);

impl FromStr for Position {
    type Err = PositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| PositionParseError(name.to_owned()))
    }
}

/// Error returned when stored flags do not describe a single position.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFlagsError {
    #[error("no role flag is set")]
    NoneSet,
    #[error("{0} role flags are set at once")]
    Several(usize),
}

/// Boolean-column representation of a role.
///
/// Only ever built from a [`Position`] or validated back into one, so the
/// exactly-one-flag invariant holds for every value that reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct RoleFlags {
    pub is_member: bool,
    pub is_secretary: bool,
    pub is_treasurer: bool,
    pub is_president: bool,
    pub is_inactive: bool,
}

impl RoleFlags {
    /// Number of flags set.
    #[must_use]
    pub fn count_set(&self) -> usize {
        [
            self.is_member,
            self.is_secretary,
            self.is_treasurer,
            self.is_president,
            self.is_inactive,
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

impl From<Position> for RoleFlags {
    fn from(position: Position) -> Self {
        Self {
            is_member: position == Position::Member,
            is_secretary: position == Position::Secretary,
            is_treasurer: position == Position::Treasurer,
            is_president: position == Position::President,
            is_inactive: position == Position::Inactive,
        }
    }
}

impl TryFrom<RoleFlags> for Position {
    type Error = RoleFlagsError;

    fn try_from(flags: RoleFlags) -> Result<Self, Self::Error> {
        match flags.count_set() {
            0 => return Err(RoleFlagsError::NoneSet),
            1 => {}
            n => return Err(RoleFlagsError::Several(n)),
        }
        let position = if flags.is_member {
            Self::Member
        } else if flags.is_secretary {
            Self::Secretary
        } else if flags.is_treasurer {
            Self::Treasurer
        } else if flags.is_president {
            Self::President
        } else {
            Self::Inactive
        };
        Ok(position)
    }
}

//! Identifiers and small enums shared by the directory, transport and travel layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque lobby identifier assigned by the session directory. `0` means "no session".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    pub const NONE: SessionId = SessionId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(SessionId)
    }
}

impl From<u64> for SessionId {
    fn from(value: u64) -> Self {
        SessionId(value)
    }
}

/// Identity of a player as known to the directory and transport.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PeerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(PeerId)
    }
}

/// What kind of map the current session carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    #[default]
    None,
    Town,
    Field,
}

impl MapType {
    /// Value stored under the `mapType` metadata key. `None` is never written.
    pub fn metadata_value(self) -> Option<&'static str> {
        match self {
            MapType::None => None,
            MapType::Town => Some("town"),
            MapType::Field => Some("field"),
        }
    }

    /// Anything other than `"field"` (including a missing key) reads as a town.
    pub fn from_metadata(value: Option<&str>) -> MapType {
        match value {
            Some("field") => MapType::Field,
            _ => MapType::Town,
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MapType::None => "none",
            MapType::Town => "town",
            MapType::Field => "field",
        };
        f.write_str(label)
    }
}

/// Which side of the transport this process plays in the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => f.write_str("host"),
            Role::Client => f.write_str("client"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_zero_is_none() {
        assert!(SessionId::NONE.is_none());
        assert!(SessionId(7).is_some());
        assert_eq!("42".parse::<SessionId>().unwrap(), SessionId(42));
        assert!("forty".parse::<SessionId>().is_err());
    }

    #[test]
    fn map_type_metadata_defaults_to_town() {
        assert_eq!(MapType::from_metadata(Some("field")), MapType::Field);
        assert_eq!(MapType::from_metadata(Some("town")), MapType::Town);
        assert_eq!(MapType::from_metadata(Some("FIELD")), MapType::Town);
        assert_eq!(MapType::from_metadata(None), MapType::Town);
        assert_eq!(MapType::None.metadata_value(), None);
    }
}

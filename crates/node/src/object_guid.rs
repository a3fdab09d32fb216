use serde::{Deserialize, Serialize};
use std::fmt;

/// Persistent, globally unique identifier of a scene object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectGuid(uuid::Uuid);

impl ObjectGuid {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// The all-zero guid. Never assigned to a live object.
    pub const fn nil() -> Self {
        Self(uuid::Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Parses a full hyphenated or simple uuid string.
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s.trim()).ok().map(Self)
    }

    /// Get the full UUID string.
    pub fn to_uuid_string(&self) -> String {
        self.0.to_string()
    }

    /// Create an ObjectGuid from a u128 (useful for tests).
    pub const fn from_u128(value: u128) -> Self {
        Self(uuid::Uuid::from_u128(value))
    }

    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }
}

impl Default for ObjectGuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObjectGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectGuid({})", &self.0.to_string()[..8])
    }
}

impl fmt::Display for ObjectGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

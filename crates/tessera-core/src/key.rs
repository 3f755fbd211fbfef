use derive_more::Display;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

///
/// Key
///
/// Primary-key value as handed to the storage collaborators.
/// Backends are schema-less, so the key is carried as a small closed set
/// of scalar shapes rather than a typed column.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Key {
    Int(i64),
    Uint(u64),
    Text(String),
    Ulid(Ulid),
}

impl Key {
    /// Whether this key is the null-equivalent (blank text).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Int(_) | Self::Uint(_) | Self::Ulid(_) => false,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for Key {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<Ulid> for Key {
    fn from(value: Ulid) -> Self {
        Self::Ulid(value)
    }
}

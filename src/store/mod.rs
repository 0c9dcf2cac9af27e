//! Store module - profile and creation store contracts plus in-memory backends

pub mod creation;
pub mod profile;

use serde::{Deserialize, Serialize};

/// Stable, externally issued user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One mutable profile per user
///
/// The credit balance is only ever mutated through signed deltas
/// (`ProfileStore::atomic_increment`), never set to an absolute value by this
/// service; top-ups come from an external billing process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub credits: i64,
}

/// Numeric profile fields addressable by `atomic_increment`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Credits,
}

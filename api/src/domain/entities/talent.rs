//! Talent domain entity

use serde::{Deserialize, Serialize};

/// Unique identifier for a talent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TalentId(pub i64);

impl From<i64> for TalentId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TalentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate recipient of outreach
#[derive(Debug, Clone, Serialize)]
pub struct Talent {
    pub id: TalentId,
    pub name: String,
    /// Channel handle messages are delivered to
    pub handle: String,
    /// Preferred language code, e.g. `en`, `fr`
    pub language: Option<String>,
    pub current_city: Option<String>,
}

//! Event and promoter identity
//!
//! Events are owned by a promoter. Campaign ownership is resolved through the
//! event a campaign targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a promoter account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromoterId(pub i64);

impl From<i64> for PromoterId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PromoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PromoterId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(PromoterId)
            .map_err(|_| format!("Invalid promoter id: {}", s))
    }
}

/// The event a campaign invites talents to
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: EventId,
    pub promoter_id: PromoterId,
    pub name: String,
    pub event_type: Option<String>,
    pub city: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn is_owned_by(&self, promoter_id: &PromoterId) -> bool {
        self.promoter_id == *promoter_id
    }
}

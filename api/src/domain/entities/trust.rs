//! Trust ledger domain entities
//!
//! `TrustScoreLog` rows are an append-only ledger. `TalentPromoterState`
//! materializes their running sum for one (talent, promoter) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::{EventId, PromoterId};
use super::talent::TalentId;

/// Unique identifier for a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustScoreLogId(pub Uuid);

impl TrustScoreLogId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrustScoreLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrustScoreLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of the trust relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TrustPair {
    pub talent_id: TalentId,
    pub promoter_id: PromoterId,
}

impl TrustPair {
    pub fn new(talent_id: TalentId, promoter_id: PromoterId) -> Self {
        Self {
            talent_id,
            promoter_id,
        }
    }
}

impl std::fmt::Display for TrustPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "talent {} / promoter {}", self.talent_id, self.promoter_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TalentPromoterState {
    pub talent_id: TalentId,
    pub promoter_id: PromoterId,
    pub trust_score: i32,
    pub last_contacted: Option<DateTime<Utc>>,
    pub last_reply: Option<DateTime<Utc>>,
    pub opted_out: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TalentPromoterState {
    /// A fresh zero-score state
    pub fn initial(pair: TrustPair, now: DateTime<Utc>) -> Self {
        Self {
            talent_id: pair.talent_id,
            promoter_id: pair.promoter_id,
            trust_score: 0,
            last_contacted: None,
            last_reply: None,
            opted_out: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn pair(&self) -> TrustPair {
        TrustPair::new(self.talent_id, self.promoter_id)
    }

    /// Score after adding `change`, or `None` when it would not fit
    pub fn score_after(&self, change: i32) -> Option<i32> {
        self.trust_score.checked_add(change)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrustScoreLog {
    pub id: TrustScoreLogId,
    pub talent_id: TalentId,
    pub promoter_id: PromoterId,
    pub event_id: Option<EventId>,
    pub change: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Data needed to append a ledger entry
#[derive(Debug, Clone)]
pub struct NewTrustScoreLog {
    pub talent_id: TalentId,
    pub promoter_id: PromoterId,
    pub event_id: Option<EventId>,
    pub change: i32,
    pub reason: String,
}

impl NewTrustScoreLog {
    pub fn pair(&self) -> TrustPair {
        TrustPair::new(self.talent_id, self.promoter_id)
    }
}

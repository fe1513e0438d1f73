//! Trust ledger service
//!
//! Maintains the per-(talent, promoter) trust score. Every score change goes
//! through this service and lands as one ledger row plus the matching score
//! update in a single repository write, so the materialized score always
//! equals the sum of the ledger.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::entities::{
    EventId, NewTrustScoreLog, TalentPromoterState, TrustPair, TrustScoreLog,
};
use crate::domain::ports::{ReplyCommit, TrustRepository};
use crate::error::{AppError, DomainError};

/// Result of a trust score change
#[derive(Debug, Clone, Serialize)]
pub struct TrustChange {
    pub pair: TrustPair,
    pub old_score: i32,
    pub new_score: i32,
    pub delta: i32,
    pub reason: String,
}

/// Materialized state of a pair together with its full ledger
#[derive(Debug, Clone, Serialize)]
pub struct TrustSnapshot {
    pub state: Option<TalentPromoterState>,
    pub logs: Vec<TrustScoreLog>,
    pub ledger_sum: i64,
}

impl TrustSnapshot {
    /// True when the materialized score matches the ledger
    pub fn is_consistent(&self) -> bool {
        let score = self.state.as_ref().map(|s| s.trust_score).unwrap_or(0);
        i64::from(score) == self.ledger_sum
    }
}

pub struct TrustLedgerService<TR>
where
    TR: TrustRepository,
{
    trust: Arc<TR>,
}

impl<TR> TrustLedgerService<TR>
where
    TR: TrustRepository,
{
    pub fn new(trust: Arc<TR>) -> Self {
        Self { trust }
    }

    pub async fn get_or_create_state(
        &self,
        pair: &TrustPair,
    ) -> Result<TalentPromoterState, AppError> {
        Ok(self.trust.get_or_create_state(pair).await?)
    }

    /// Append a ledger entry and move the score by `delta`
    pub async fn apply_delta(
        &self,
        pair: &TrustPair,
        delta: i32,
        reason: &str,
        event_id: Option<EventId>,
    ) -> Result<TrustChange, AppError> {
        let reason = validate_reason(reason)?;

        let entry = NewTrustScoreLog {
            talent_id: pair.talent_id,
            promoter_id: pair.promoter_id,
            event_id,
            change: delta,
            reason: reason.clone(),
        };
        let state = self.trust.apply(&entry).await?;

        Ok(self.change_applied(*pair, &state, delta, reason))
    }

    /// Persist an interpreted reply. The score change and every other effect of
    /// the interpretation are written together or not at all.
    pub async fn record_reply(&self, commit: &ReplyCommit) -> Result<TrustChange, AppError> {
        validate_reason(&commit.entry.reason)?;

        let state = self.trust.commit_reply(commit).await?;

        Ok(self.change_applied(
            commit.entry.pair(),
            &state,
            commit.entry.change,
            commit.entry.reason.clone(),
        ))
    }

    /// State and ledger of a pair
    pub async fn snapshot(&self, pair: &TrustPair) -> Result<TrustSnapshot, AppError> {
        let state = self.trust.find_state(pair).await?;
        let logs = self.trust.find_logs(pair).await?;
        let ledger_sum = self.trust.sum_changes(pair).await?;

        Ok(TrustSnapshot {
            state,
            logs,
            ledger_sum,
        })
    }

    fn change_applied(
        &self,
        pair: TrustPair,
        state: &TalentPromoterState,
        delta: i32,
        reason: String,
    ) -> TrustChange {
        let new_score = state.trust_score;
        let old_score = new_score - delta;

        tracing::info!(
            talent_id = %pair.talent_id,
            promoter_id = %pair.promoter_id,
            old_score = old_score,
            new_score = new_score,
            delta = delta,
            reason = %reason,
            "Trust score change applied"
        );

        TrustChange {
            pair,
            old_score,
            new_score,
            delta,
            reason,
        }
    }
}

fn validate_reason(reason: &str) -> Result<String, DomainError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::Validation(
            "Trust score change needs a reason".to_string(),
        ));
    }
    Ok(reason.to_string())
}

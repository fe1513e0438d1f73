//! Batch gate
//!
//! Batch 1 of a campaign may always send. Batch N may start only once batch
//! N-1 is non-empty, at least 90% of it has been sent and its most recent
//! invitation went out at least 12 hours ago.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::app::outreach_config::{BATCH_GATE_COOLDOWN_HOURS, BATCH_GATE_MIN_SENT_PERCENT};
use crate::domain::entities::{CampaignId, InvitationFilter, InvitationStatus};
use crate::domain::ports::InvitationRepository;
use crate::error::DomainError;

/// Why a batch is or is not allowed to start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    FirstBatch,
    Ready,
    PreviousBatchEmpty,
    PreviousBatchIncomplete,
    CoolingDown,
}

/// A gate decision together with the inputs it was based on
#[derive(Debug, Clone, Serialize)]
pub struct GateDecision {
    pub batch: i32,
    pub allowed: bool,
    pub reason: GateReason,
    pub previous_total: u64,
    pub previous_sent: u64,
    pub sent_ratio: Option<f64>,
    pub last_invitation_at: Option<DateTime<Utc>>,
}

/// Decide from already-loaded figures. Pure, so boundaries are easy to test.
pub fn evaluate(
    batch: i32,
    previous_total: u64,
    previous_sent: u64,
    last_invitation_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> GateDecision {
    let sent_ratio = (previous_total > 0).then(|| previous_sent as f64 / previous_total as f64);

    let reason = if batch <= 1 {
        GateReason::FirstBatch
    } else if previous_total == 0 {
        GateReason::PreviousBatchEmpty
    } else if previous_sent * 100 < previous_total * BATCH_GATE_MIN_SENT_PERCENT {
        GateReason::PreviousBatchIncomplete
    } else {
        match last_invitation_at {
            Some(last) if now - last >= Duration::hours(BATCH_GATE_COOLDOWN_HOURS) => {
                GateReason::Ready
            }
            _ => GateReason::CoolingDown,
        }
    };

    GateDecision {
        batch,
        allowed: matches!(reason, GateReason::FirstBatch | GateReason::Ready),
        reason,
        previous_total,
        previous_sent,
        sent_ratio,
        last_invitation_at,
    }
}

/// Loads the previous batch's figures and applies `evaluate`. Read-only.
pub struct BatchGate<IR>
where
    IR: InvitationRepository,
{
    invitations: Arc<IR>,
}

impl<IR> BatchGate<IR>
where
    IR: InvitationRepository,
{
    pub fn new(invitations: Arc<IR>) -> Self {
        Self { invitations }
    }

    pub async fn can_start(
        &self,
        campaign_id: &CampaignId,
        batch: i32,
        now: DateTime<Utc>,
    ) -> Result<GateDecision, DomainError> {
        if batch <= 1 {
            return Ok(evaluate(batch, 0, 0, None, now));
        }

        let previous = batch - 1;
        let in_previous = InvitationFilter::new().campaign(*campaign_id).batch(previous);

        let total = self.invitations.count(&in_previous).await?;
        let sent = self
            .invitations
            .count(&in_previous.status_in(InvitationStatus::POST_SEND))
            .await?;
        let last = self
            .invitations
            .latest_invitation_at(campaign_id, previous)
            .await?;

        let decision = evaluate(batch, total, sent, last, now);

        tracing::debug!(
            campaign_id = %campaign_id,
            batch = batch,
            allowed = decision.allowed,
            reason = ?decision.reason,
            previous_total = total,
            previous_sent = sent,
            "Batch gate evaluated"
        );

        Ok(decision)
    }
}

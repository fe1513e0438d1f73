//! Campaign statistics

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::outreach_config::AVERAGE_SEND_GAP_SECS;
use crate::domain::entities::{
    CampaignId, CampaignInvitation, InvitationFilter, InvitationId, InvitationStatus,
    MessageDirection,
};
use crate::domain::ports::{InvitationRepository, MessageRepository};
use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CampaignTotals {
    pub invitations: u64,
    /// Invitations whose first message went out
    pub sent: u64,
    pub sent_messages: u64,
    pub received_messages: u64,
    pub confirmed: u64,
    pub maybe: u64,
    pub declined: u64,
    pub attended: u64,
    pub seen_without_reply: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub batch: i32,
    pub invitations: u64,
    pub sent: u64,
    pub first_invitation_at: Option<DateTime<Utc>>,
    pub last_invitation_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignStats {
    pub campaign_id: CampaignId,
    pub batch: Option<i32>,
    pub totals: CampaignTotals,
    pub batches: Vec<BatchStats>,
    /// Invitations still waiting for their first message
    pub unsent: u64,
    /// Rough time to send the unsent remainder at the average pace
    pub eta_seconds: i64,
}

pub struct CampaignStatsService<IR, MR>
where
    IR: InvitationRepository,
    MR: MessageRepository,
{
    invitations: Arc<IR>,
    messages: Arc<MR>,
}

impl<IR, MR> CampaignStatsService<IR, MR>
where
    IR: InvitationRepository,
    MR: MessageRepository,
{
    pub fn new(invitations: Arc<IR>, messages: Arc<MR>) -> Self {
        Self {
            invitations,
            messages,
        }
    }

    /// Statistics of a campaign, optionally restricted to one batch.
    /// Ownership is checked by the caller.
    pub async fn campaign_stats(
        &self,
        campaign_id: &CampaignId,
        batch: Option<i32>,
    ) -> Result<CampaignStats, AppError> {
        let mut filter = InvitationFilter::new().campaign(*campaign_id);
        if let Some(batch) = batch {
            filter = filter.batch(batch);
        }
        let invitations = self.invitations.find(&filter).await?;

        let in_scope: HashSet<InvitationId> = invitations.iter().map(|i| i.id).collect();
        let messages = self.messages.find_by_campaign(campaign_id).await?;

        let mut totals = summarize(&invitations);
        for message in messages.iter().filter(|m| in_scope.contains(&m.invitation_id)) {
            match message.direction {
                MessageDirection::Sent => totals.sent_messages += 1,
                MessageDirection::Received => totals.received_messages += 1,
            }
        }

        let unsent = totals.invitations - totals.sent;

        Ok(CampaignStats {
            campaign_id: *campaign_id,
            batch,
            batches: per_batch(&invitations),
            unsent,
            eta_seconds: AVERAGE_SEND_GAP_SECS * unsent as i64,
            totals,
        })
    }
}

fn summarize(invitations: &[CampaignInvitation]) -> CampaignTotals {
    let mut totals = CampaignTotals {
        invitations: invitations.len() as u64,
        ..Default::default()
    };

    for inv in invitations {
        if inv.invitation_at.is_some() {
            totals.sent += 1;
        }
        match inv.status {
            InvitationStatus::Confirmed => totals.confirmed += 1,
            InvitationStatus::Maybe => totals.maybe += 1,
            InvitationStatus::Declined => totals.declined += 1,
            InvitationStatus::Attended => totals.attended += 1,
            _ => {}
        }
        if inv.is_seen && !inv.has_replied {
            totals.seen_without_reply += 1;
        }
    }

    totals
}

fn per_batch(invitations: &[CampaignInvitation]) -> Vec<BatchStats> {
    let mut batches: BTreeMap<i32, BatchStats> = BTreeMap::new();

    for inv in invitations {
        let entry = batches.entry(inv.batch).or_insert_with(|| BatchStats {
            batch: inv.batch,
            invitations: 0,
            sent: 0,
            first_invitation_at: None,
            last_invitation_at: None,
        });
        entry.invitations += 1;
        if let Some(at) = inv.invitation_at {
            entry.sent += 1;
            entry.first_invitation_at = Some(entry.first_invitation_at.map_or(at, |f| f.min(at)));
            entry.last_invitation_at = Some(entry.last_invitation_at.map_or(at, |l| l.max(at)));
        }
    }

    batches.into_values().collect()
}

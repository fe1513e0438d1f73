//! Campaign invitation domain entity
//!
//! The invitation is the unit the outreach pipelines advance. Its primary
//! status moves through the lifecycle below; `followup`, `followup_sent` and
//! `thank_you_sent` are side flags layered on top of it.
//!
//! ```text
//! pending -> sent -> {confirmed, declined, maybe, ignored} -> attended
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::campaign::CampaignId;
use super::event::{EventId, PromoterId};
use super::talent::TalentId;

/// Unique identifier for an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationId(pub i64);

impl From<i64> for InvitationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for InvitationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary invitation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Sent,
    Confirmed,
    Declined,
    Maybe,
    Ignored,
    Attended,
}

impl InvitationStatus {
    /// Every status an invitation can hold once its first message went out
    pub const POST_SEND: [InvitationStatus; 6] = [
        InvitationStatus::Sent,
        InvitationStatus::Confirmed,
        InvitationStatus::Declined,
        InvitationStatus::Maybe,
        InvitationStatus::Ignored,
        InvitationStatus::Attended,
    ];

    pub fn is_post_send(&self) -> bool {
        *self != InvitationStatus::Pending
    }

    /// Statuses a reply interpretation may set directly
    pub fn is_reply_outcome(&self) -> bool {
        matches!(
            self,
            InvitationStatus::Confirmed
                | InvitationStatus::Declined
                | InvitationStatus::Maybe
                | InvitationStatus::Ignored
        )
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationStatus::Pending => write!(f, "pending"),
            InvitationStatus::Sent => write!(f, "sent"),
            InvitationStatus::Confirmed => write!(f, "confirmed"),
            InvitationStatus::Declined => write!(f, "declined"),
            InvitationStatus::Maybe => write!(f, "maybe"),
            InvitationStatus::Ignored => write!(f, "ignored"),
            InvitationStatus::Attended => write!(f, "attended"),
        }
    }
}

impl std::str::FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(InvitationStatus::Pending),
            "sent" => Ok(InvitationStatus::Sent),
            "confirmed" => Ok(InvitationStatus::Confirmed),
            "declined" => Ok(InvitationStatus::Declined),
            "maybe" => Ok(InvitationStatus::Maybe),
            "ignored" => Ok(InvitationStatus::Ignored),
            "attended" => Ok(InvitationStatus::Attended),
            _ => Err(format!("Unknown invitation status: {}", s)),
        }
    }
}

/// An invitation of one talent to one campaign
#[derive(Debug, Clone, Serialize)]
pub struct CampaignInvitation {
    pub id: InvitationId,
    pub campaign_id: CampaignId,
    pub talent_id: TalentId,
    pub promoter_id: PromoterId,
    pub event_id: EventId,
    pub batch: i32,
    pub status: InvitationStatus,
    /// When the initial invitation message was sent
    pub invitation_at: Option<DateTime<Utc>>,
    /// Operator asked for a followup message
    pub followup: bool,
    pub followup_sent: bool,
    pub thank_you_sent: bool,
    pub has_replied: bool,
    pub is_seen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignInvitation {
    /// Apply a patch in place. Used by in-memory stores and to preview results.
    pub fn apply(&mut self, patch: &InvitationPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(at) = patch.invitation_at {
            self.invitation_at = Some(at);
        }
        if let Some(followup) = patch.followup {
            self.followup = followup;
        }
        if let Some(sent) = patch.followup_sent {
            self.followup_sent = sent;
        }
        if let Some(sent) = patch.thank_you_sent {
            self.thank_you_sent = sent;
        }
        if let Some(replied) = patch.has_replied {
            self.has_replied = replied;
        }
        self.updated_at = now;
    }
}

/// Data needed to create a new invitation
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub campaign_id: CampaignId,
    pub talent_id: TalentId,
    pub promoter_id: PromoterId,
    pub event_id: EventId,
    pub batch: i32,
}

/// A set of field changes produced by a state transition.
///
/// Only `Some` fields are written. Patches are built by the invitation state
/// machine and applied by repositories inside their atomic writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvitationPatch {
    pub status: Option<InvitationStatus>,
    pub invitation_at: Option<DateTime<Utc>>,
    pub followup: Option<bool>,
    pub followup_sent: Option<bool>,
    pub thank_you_sent: Option<bool>,
    pub has_replied: Option<bool>,
}

impl InvitationPatch {
    pub fn is_empty(&self) -> bool {
        *self == InvitationPatch::default()
    }
}

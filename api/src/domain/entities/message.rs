//! Campaign message domain entity
//!
//! Messages are immutable records of one sent or received text. Only the
//! interpretation flags on received messages are ever flipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::campaign::CampaignId;
use super::event::PromoterId;
use super::invitation::InvitationId;
use super::spintax_template::Stage;
use super::talent::TalentId;

/// Unique identifier for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Sent,
    Received,
}

impl std::fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageDirection::Sent => write!(f, "sent"),
            MessageDirection::Received => write!(f, "received"),
        }
    }
}

impl std::str::FromStr for MessageDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(MessageDirection::Sent),
            "received" => Ok(MessageDirection::Received),
            _ => Err(format!("Unknown message direction: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignMessage {
    pub id: MessageId,
    pub campaign_id: CampaignId,
    pub invitation_id: InvitationId,
    pub talent_id: TalentId,
    pub promoter_id: PromoterId,
    pub direction: MessageDirection,
    /// Stage of an outbound message; `None` for received messages
    pub stage: Option<Stage>,
    pub body: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub is_interpret: bool,
    pub is_score_analyzed: bool,
    pub created_at: DateTime<Utc>,
}

impl CampaignMessage {
    /// The moment the message crossed the channel, whichever direction
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.sent_at.or(self.received_at).unwrap_or(self.created_at)
    }
}

/// Data needed to record a message
#[derive(Debug, Clone)]
pub struct NewCampaignMessage {
    pub campaign_id: CampaignId,
    pub invitation_id: InvitationId,
    pub talent_id: TalentId,
    pub promoter_id: PromoterId,
    pub direction: MessageDirection,
    pub stage: Option<Stage>,
    pub body: String,
    pub at: DateTime<Utc>,
}

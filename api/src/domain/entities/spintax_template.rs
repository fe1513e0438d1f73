//! Spintax template domain entity
//!
//! A template is one interchangeable content variant for a
//! (campaign, stage, language) tuple.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::campaign::CampaignId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpintaxTemplateId(pub i64);

impl std::fmt::Display for SpintaxTemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The point in the outreach lifecycle a message serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Invitation,
    Followup,
    Postevent,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Invitation, Stage::Followup, Stage::Postevent];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Invitation => write!(f, "invitation"),
            Stage::Followup => write!(f, "followup"),
            Stage::Postevent => write!(f, "postevent"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "invitation" => Ok(Stage::Invitation),
            "followup" => Ok(Stage::Followup),
            "postevent" => Ok(Stage::Postevent),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpintaxTemplate {
    pub id: SpintaxTemplateId,
    pub campaign_id: CampaignId,
    pub stage: Stage,
    pub lang: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSpintaxTemplate {
    pub campaign_id: CampaignId,
    pub stage: Stage,
    pub lang: String,
    pub content: String,
}

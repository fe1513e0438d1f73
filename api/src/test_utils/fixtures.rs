//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults.
//! Each fixture creates a valid entity that can be customized.
//!
//! Invitations and templates are created with ID 0; the in-memory store
//! assigns sequential IDs on insert. Invitations of campaign N belong to
//! event N and promoter N.

use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::{
    Campaign, CampaignId, CampaignInvitation, CampaignMessage, CampaignStatus, Event, EventId,
    InvitationId, InvitationStatus, MessageDirection, MessageId, PromoterId, SpintaxTemplate,
    SpintaxTemplateId, Stage, Talent, TalentId,
};

/// Create a campaign for an event
pub fn test_campaign(id: i64, event_id: i64, status: CampaignStatus) -> Campaign {
    Campaign {
        id: CampaignId(id),
        event_id: EventId(event_id),
        name: format!("Campaign {}", id),
        status,
        post_event_trigger_at: None,
        created_at: Utc::now() - Duration::days(7),
    }
}

/// Create an event owned by a promoter
pub fn test_event(id: i64, promoter_id: PromoterId) -> Event {
    Event {
        id: EventId(id),
        promoter_id,
        name: format!("Event {}", id),
        event_type: Some("Launch party".to_string()),
        city: Some("Lisbon".to_string()),
        starts_at: Some(Utc::now() + Duration::days(14)),
    }
}

/// Create a talent with handle `@talent<id>`
pub fn test_talent(id: i64, language: Option<&str>) -> Talent {
    Talent {
        id: TalentId(id),
        name: format!("Talent {}", id),
        handle: format!("@talent{}", id),
        language: language.map(str::to_string),
        current_city: None,
    }
}

/// Create a pending invitation
pub fn test_invitation(campaign_id: CampaignId, talent_id: TalentId, batch: i32) -> CampaignInvitation {
    let created = Utc::now() - Duration::days(1);
    CampaignInvitation {
        id: InvitationId(0),
        campaign_id,
        talent_id,
        promoter_id: PromoterId(campaign_id.0),
        event_id: EventId(campaign_id.0),
        batch,
        status: InvitationStatus::Pending,
        invitation_at: None,
        followup: false,
        followup_sent: false,
        thank_you_sent: false,
        has_replied: false,
        is_seen: false,
        created_at: created,
        updated_at: created,
    }
}

/// Create an invitation whose first message went out at `at`
pub fn sent_invitation(
    campaign_id: CampaignId,
    talent_id: TalentId,
    batch: i32,
    at: DateTime<Utc>,
) -> CampaignInvitation {
    CampaignInvitation {
        status: InvitationStatus::Sent,
        invitation_at: Some(at),
        updated_at: at,
        ..test_invitation(campaign_id, talent_id, batch)
    }
}

/// Create a template for a campaign stage
pub fn test_template(
    campaign_id: CampaignId,
    stage: Stage,
    lang: &str,
    content: &str,
) -> SpintaxTemplate {
    SpintaxTemplate {
        id: SpintaxTemplateId(0),
        campaign_id,
        stage,
        lang: lang.to_string(),
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

/// Create an uninterpreted reply
pub fn received_message(
    campaign_id: CampaignId,
    invitation_id: InvitationId,
    talent_id: TalentId,
    promoter_id: PromoterId,
    body: &str,
    at: DateTime<Utc>,
) -> CampaignMessage {
    CampaignMessage {
        id: MessageId::new(),
        campaign_id,
        invitation_id,
        talent_id,
        promoter_id,
        direction: MessageDirection::Received,
        stage: None,
        body: body.to_string(),
        sent_at: None,
        received_at: Some(at),
        is_interpret: false,
        is_score_analyzed: false,
        created_at: at,
    }
}

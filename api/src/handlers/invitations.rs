//! Campaign invitation handlers
//!
//! Promoter-scoped endpoints for managing who is invited to a campaign.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    CampaignId, CampaignInvitation, InvitationFilter, InvitationId, InvitationStatus, PromoterId,
    TalentId,
};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BulkInvitationRequest {
    #[serde(alias = "campaignId")]
    pub campaign_id: CampaignId,
    #[serde(alias = "invitationIds")]
    pub invitation_ids: Vec<InvitationId>,
}

#[derive(Debug, Serialize)]
pub struct BulkUpdateResponse {
    pub updated: u64,
}

#[derive(Debug, Deserialize)]
pub struct AddTalentsRequest {
    #[serde(alias = "talentIds")]
    pub talent_ids: Vec<TalentId>,
    #[serde(default = "first_batch")]
    pub batch: i32,
}

fn first_batch() -> i32 {
    1
}

/// Query string of the invitation listing. `status` takes a comma separated set.
#[derive(Debug, Default, Deserialize)]
pub struct ListInvitationsQuery {
    pub batch: Option<i32>,
    pub status: Option<String>,
    pub has_replied: Option<bool>,
    pub is_seen: Option<bool>,
    pub followup_sent: Option<bool>,
    pub thank_you_sent: Option<bool>,
}

impl ListInvitationsQuery {
    fn to_filter(&self) -> Result<InvitationFilter, AppError> {
        let mut filter = InvitationFilter::new();

        if let Some(batch) = self.batch {
            filter = filter.batch(batch);
        }
        if let Some(status) = &self.status {
            let statuses = status
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<InvitationStatus>().map_err(AppError::BadRequest))
                .collect::<Result<Vec<_>, _>>()?;
            if !statuses.is_empty() {
                filter = filter.status_in(statuses);
            }
        }
        if let Some(v) = self.has_replied {
            filter = filter.has_replied(v);
        }
        if let Some(v) = self.is_seen {
            filter = filter.is_seen(v);
        }
        if let Some(v) = self.followup_sent {
            filter = filter.followup_sent(v);
        }
        if let Some(v) = self.thank_you_sent {
            filter = filter.thank_you_sent(v);
        }

        Ok(filter)
    }
}

/// PATCH /campaign-invitations/mark-attended
pub async fn mark_attended(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Json(request): Json<BulkInvitationRequest>,
) -> Result<Json<BulkUpdateResponse>, AppError> {
    let updated = state
        .invitation_service
        .mark_attended(
            &request.campaign_id,
            &promoter,
            &request.invitation_ids,
            Utc::now(),
        )
        .await?;

    Ok(Json(BulkUpdateResponse { updated }))
}

/// PATCH /campaign-invitations/mark-followup
pub async fn mark_followup(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Json(request): Json<BulkInvitationRequest>,
) -> Result<Json<BulkUpdateResponse>, AppError> {
    let updated = state
        .invitation_service
        .mark_followup(
            &request.campaign_id,
            &promoter,
            &request.invitation_ids,
            Utc::now(),
        )
        .await?;

    Ok(Json(BulkUpdateResponse { updated }))
}

/// GET /campaign-invitations/campaign/:campaign_id
pub async fn list_invitations(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Path(campaign_id): Path<i64>,
    Query(query): Query<ListInvitationsQuery>,
) -> Result<Json<Vec<CampaignInvitation>>, AppError> {
    let filter = query.to_filter()?;
    let invitations = state
        .invitation_service
        .list_invitations(&CampaignId(campaign_id), &promoter, filter)
        .await?;

    Ok(Json(invitations))
}

/// POST /campaign-invitations/campaign/:campaign_id
pub async fn add_talents(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Path(campaign_id): Path<i64>,
    Json(request): Json<AddTalentsRequest>,
) -> Result<(StatusCode, Json<Vec<CampaignInvitation>>), AppError> {
    let invitations = state
        .invitation_service
        .add_talents(
            &CampaignId(campaign_id),
            &promoter,
            &request.talent_ids,
            request.batch,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(invitations)))
}

/// DELETE /campaign-invitations/campaign/:campaign_id/:invitation_id
pub async fn remove_invitation(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Path((campaign_id, invitation_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    state
        .invitation_service
        .remove_invitation(
            &CampaignId(campaign_id),
            &InvitationId(invitation_id),
            &promoter,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

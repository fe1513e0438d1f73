//! Campaign handlers
//!
//! Batch gate, statistics and talent recommendations for a promoter's
//! campaigns.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::app::{CampaignStats, GateDecision, RecommendationQuery, TalentRecommendation};
use crate::domain::entities::{CampaignId, PromoterId};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub batch: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationsQuery {
    #[serde(alias = "trustScore")]
    pub min_trust: Option<i32>,
    pub limit: Option<u64>,
}

/// GET /campaigns/:campaign_id/batches/:batch/can-start
///
/// Whether the batch may start sending, with the figures the decision used.
pub async fn can_start_batch(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Path((campaign_id, batch)): Path<(i64, i32)>,
) -> Result<Json<GateDecision>, AppError> {
    let decision = state
        .invitation_service
        .can_start_batch(&CampaignId(campaign_id), batch, &promoter, Utc::now())
        .await?;

    Ok(Json(decision))
}

/// GET /campaigns/:campaign_id/stats
pub async fn campaign_stats(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Path(campaign_id): Path<i64>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<CampaignStats>, AppError> {
    let campaign_id = CampaignId(campaign_id);
    state
        .invitation_service
        .owned_campaign(&campaign_id, &promoter)
        .await?;

    let stats = state
        .stats_service
        .campaign_stats(&campaign_id, query.batch)
        .await?;

    Ok(Json(stats))
}

/// GET /campaigns/:campaign_id/recommendations
///
/// Talents not yet invited, excluding those who opted out of the promoter.
pub async fn recommend_talents(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Path(campaign_id): Path<i64>,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<Vec<TalentRecommendation>>, AppError> {
    let recommendations = state
        .invitation_service
        .recommend_talents(
            &CampaignId(campaign_id),
            &promoter,
            &RecommendationQuery {
                min_trust: query.min_trust,
                limit: query.limit,
            },
        )
        .await?;

    Ok(Json(recommendations))
}

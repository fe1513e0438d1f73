//! Trust ledger handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::{TrustChange, TrustSnapshot};
use crate::domain::entities::{EventId, PromoterId, TalentId, TrustPair};
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TrustStateResponse {
    #[serde(flatten)]
    pub snapshot: TrustSnapshot,
    /// The materialized score equals the sum of the ledger
    pub consistent: bool,
}

#[derive(Debug, Deserialize)]
pub struct AdjustTrustRequest {
    pub delta: i32,
    pub reason: String,
    #[serde(default)]
    pub event_id: Option<EventId>,
}

/// GET /trust/:talent_id
///
/// Trust state and full ledger between the talent and the calling promoter.
pub async fn get_trust_state(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Path(talent_id): Path<i64>,
) -> Result<Json<TrustStateResponse>, AppError> {
    let pair = TrustPair::new(TalentId(talent_id), promoter);
    let snapshot = state.trust_ledger.snapshot(&pair).await?;

    Ok(Json(TrustStateResponse {
        consistent: snapshot.is_consistent(),
        snapshot,
    }))
}

/// POST /trust/:talent_id/adjustments
///
/// Manual ledger entry by the promoter.
pub async fn adjust_trust(
    State(state): State<AppState>,
    Extension(promoter): Extension<PromoterId>,
    Path(talent_id): Path<i64>,
    Json(request): Json<AdjustTrustRequest>,
) -> Result<Json<TrustChange>, AppError> {
    let pair = TrustPair::new(TalentId(talent_id), promoter);
    let change = state
        .trust_ledger
        .apply_delta(&pair, request.delta, &request.reason, request.event_id)
        .await?;

    tracing::info!(
        pair = %pair,
        delta = request.delta,
        new_score = change.new_score,
        "Trust adjusted manually"
    );

    Ok(Json(change))
}

//! Inbound reply handler
//!
//! The channel listener forwards every talent reply here. Replies are only
//! stored; the reply pipeline interprets them on its next tick.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::domain::entities::{CampaignId, MessageId, TalentId};
use crate::error::AppError;
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "X-Signature-256";

#[derive(Debug, Deserialize)]
pub struct InboundReplyPayload {
    pub campaign_id: CampaignId,
    pub talent_id: TalentId,
    pub text: String,
    /// When the channel received the reply; defaults to now
    #[serde(default)]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct InboundReplyResponse {
    pub message_id: MessageId,
}

/// Verify HMAC-SHA256 signature
fn verify_signature(payload: &[u8], signature: Option<&str>, secret: &Option<String>) -> bool {
    let Some(secret) = secret else {
        // No secret configured, skip verification (development mode)
        tracing::warn!("Inbound secret not configured, skipping signature verification");
        return true;
    };

    let Some(sig_header) = signature else {
        tracing::warn!("No signature provided in inbound reply");
        return false;
    };

    let expected_hex = sig_header.strip_prefix("sha256=").unwrap_or(sig_header);

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => {
            tracing::error!("Invalid inbound secret key");
            return false;
        }
    };

    mac.update(payload);

    let expected_bytes = match hex::decode(expected_hex) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::warn!("Invalid signature format");
            return false;
        }
    };

    mac.verify_slice(&expected_bytes).is_ok()
}

/// POST /inbound/replies
pub async fn record_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<InboundReplyResponse>), AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok());

    if !verify_signature(&body, signature, &state.config.inbound_secret) {
        tracing::warn!("Inbound reply signature verification failed");
        return Err(AppError::Unauthorized);
    }

    let payload: InboundReplyPayload = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse inbound reply");
        AppError::BadRequest(format!("Invalid JSON: {}", e))
    })?;

    let message = state
        .invitation_service
        .record_inbound_reply(
            &payload.campaign_id,
            &payload.talent_id,
            &payload.text,
            payload.received_at.unwrap_or_else(Utc::now),
        )
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(InboundReplyResponse {
            message_id: message.id,
        }),
    ))
}

//! Promoter identity middleware
//!
//! The upstream gateway authenticates promoters and forwards the caller's ID
//! in `X-Promoter-Id`. This layer only validates and exposes it.

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::domain::entities::PromoterId;
use crate::error::AppError;

pub const PROMOTER_HEADER: &str = "X-Promoter-Id";

/// Extract the promoter ID from the request headers
fn extract_promoter_id(request: &Request<Body>) -> Option<PromoterId> {
    request
        .headers()
        .get(PROMOTER_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.parse().ok())
        .filter(|id: &PromoterId| id.0 > 0)
}

/// Promoter middleware
///
/// Rejects requests without a valid promoter ID and injects the `PromoterId`
/// into request extensions for the handlers.
pub async fn promoter_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let promoter_id = extract_promoter_id(&request).ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(promoter_id);

    Ok(next.run(request).await)
}

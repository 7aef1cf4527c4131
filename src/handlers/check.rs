use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use crate::auth::classify;
use crate::error::{AppError, rate_limit_headers};
use crate::metrics::{CHECKS_TOTAL, REJECTED_TOTAL};
use crate::models::{CheckResponse, RateLimitInfo};
use crate::state::AppState;

pub async fn check_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    CHECKS_TOTAL.inc();

    let identity = classify(&headers, state.auth.as_ref()).await;
    let decision = state.limiter.check(&identity)?;

    if !decision.allowed {
        REJECTED_TOTAL.inc();
        tracing::debug!(
            key = %identity.key(),
            retry_after = decision.retry_after_secs(),
            "rate limit exceeded"
        );
        return Err(AppError::RateLimited(decision));
    }

    // No body, oversized body or invalid JSON - that's okay
    let body = match body {
        Ok(bytes) => serde_json::from_slice(&bytes).ok(),
        Err(e) => {
            tracing::debug!(key = %identity.key(), "request body not echoed: {e}");
            None
        }
    };

    let response = CheckResponse {
        success: true,
        rate_limit: RateLimitInfo {
            remaining: decision.remaining,
            limit: decision.limit,
            reset_time: decision.reset_secs(),
        },
        authenticated: identity.is_authenticated(),
        body,
    };

    Ok((rate_limit_headers(&decision), Json(response)).into_response())
}

// Bare OPTIONS; the cors middleware adds the headers
pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

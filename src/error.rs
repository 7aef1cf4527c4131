use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::{InternalErrorBody, RateLimitedBody};
use crate::rate_limit::Decision;

/// Failures inside the limiter itself.
#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("system clock reads {0}ms, before the Unix epoch")]
    ClockBeforeEpoch(i64),
}

/// Reasons a bearer token could not be turned into a user id.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("auth service rejected token with status {0}")]
    Rejected(reqwest::StatusCode),
    #[error("auth service returned no subject")]
    MissingSubject,
}

/// Everything the check endpoint can answer with besides success.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("rate limit exceeded, retry in {}s", .0.retry_after_secs())]
    RateLimited(Decision),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LimiterError> for AppError {
    fn from(e: LimiterError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::RateLimited(decision) => {
                let retry_after = decision.retry_after_secs();
                let body = RateLimitedBody {
                    error: "Too Many Requests",
                    message: "Rate limit exceeded. Please try again later.",
                    retry_after,
                };

                let mut headers = rate_limit_headers(&decision);
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));

                (StatusCode::TOO_MANY_REQUESTS, headers, Json(body)).into_response()
            }
            AppError::Internal(msg) => {
                // Log the real error server-side, return generic message to client
                tracing::error!(error = %msg, "rate limit check failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(InternalErrorBody {
                        error: "Internal server error",
                    }),
                )
                    .into_response()
            }
        }
    }
}

pub fn rate_limit_headers(decision: &Decision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_secs()));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected() -> Decision {
        Decision {
            allowed: false,
            remaining: 0,
            limit: 30,
            reset_time_ms: 1_700_000_060_000,
            now_ms: 1_700_000_017_500,
        }
    }

    #[test]
    fn rate_limited_maps_to_429_with_retry_after() {
        let response = AppError::RateLimited(rejected()).into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "43");
        assert_eq!(response.headers()["x-ratelimit-limit"], "30");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["x-ratelimit-reset"], "1700000060");
    }

    #[test]
    fn internal_maps_to_500() {
        let err: AppError = LimiterError::ClockBeforeEpoch(-5).into();
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}

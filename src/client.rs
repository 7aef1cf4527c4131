//! Caller-side wrapper: ask the gate first, make the real call only if admitted.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{CheckResponse, RateLimitInfo, RateLimitedReply};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Rate limited. Retry after {retry_after} seconds.")]
    RateLimited { retry_after: u64 },
    #[error("Failed to check rate limit: {0}")]
    Unavailable(String),
    #[error("Request failed: {0}")]
    Downstream(StatusCode),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// What the gate reported for an admitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub rate_limit: RateLimitInfo,
    pub authenticated: bool,
}

#[derive(Debug, Clone)]
pub struct GateClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GateClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Asks the gate whether one more request is allowed.
    pub async fn check(&self, access_token: Option<&str>) -> Result<RateLimitStatus, GateError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let res = request
            .send()
            .await
            .map_err(|e| GateError::Unavailable(e.to_string()))?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let reply: RateLimitedReply = res
                .json()
                .await
                .map_err(|e| GateError::Unavailable(e.to_string()))?;
            return Err(GateError::RateLimited {
                retry_after: reply.retry_after,
            });
        }
        if !res.status().is_success() {
            return Err(GateError::Unavailable(res.status().to_string()));
        }

        let body: CheckResponse = res
            .json()
            .await
            .map_err(|e| GateError::Unavailable(e.to_string()))?;
        Ok(RateLimitStatus {
            rate_limit: body.rate_limit,
            authenticated: body.authenticated,
        })
    }

    /// Checks the gate, then fetches `url` and decodes its JSON body.
    pub async fn gated_fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: Option<&str>,
    ) -> Result<T, GateError> {
        self.gated_send(self.client.get(url), access_token).await
    }

    /// Checks the gate, then sends `request` (any method and body) and
    /// decodes its JSON response. The request is never sent when the gate
    /// refuses or cannot be reached.
    pub async fn gated_send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        access_token: Option<&str>,
    ) -> Result<T, GateError> {
        self.check(access_token).await?;

        let res = request.send().await?;
        if !res.status().is_success() {
            return Err(GateError::Downstream(res.status()));
        }
        Ok(res.json().await?)
    }
}

//! Caller identification: client IP from proxy headers, user id from an
//! optional bearer token resolved against the auth service.

use axum::http::HeaderMap;
use std::time::{Duration, Instant};

use crate::error::AuthError;
use crate::metrics::{AUTH_DOWNGRADES, AUTH_LATENCY};
use crate::models::UserClaims;
use crate::rate_limit::Identity;

pub const UNKNOWN_IP: &str = "unknown";

/// Resolves bearer tokens to user ids via `GET {base_url}/auth/v1/user`.
#[derive(Debug, Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AuthClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    pub async fn resolve(&self, token: &str) -> Result<String, AuthError> {
        let mut request = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(token)
            .timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let res = request.send().await?;
        if !res.status().is_success() {
            return Err(AuthError::Rejected(res.status()));
        }

        let claims: UserClaims = res.json().await?;
        claims.subject().ok_or(AuthError::MissingSubject)
    }
}

// First x-forwarded-for hop, then x-real-ip, then "unknown"
pub fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Works out who to count a request against. Never fails: a token that
/// cannot be resolved, for whatever reason, leaves the caller anonymous.
pub async fn classify(headers: &HeaderMap, auth: Option<&AuthClient>) -> Identity {
    let ip = client_ip(headers);

    let (Some(token), Some(auth)) = (bearer_token(headers), auth) else {
        return Identity::Anonymous { ip };
    };

    let started = Instant::now();
    let resolved = auth.resolve(token).await;
    AUTH_LATENCY.observe(started.elapsed().as_secs_f64());

    match resolved {
        Ok(user_id) => Identity::Authenticated { user_id },
        Err(e) => {
            AUTH_DOWNGRADES.inc();
            match &e {
                AuthError::Transport(_) => tracing::warn!(%ip, "token lookup failed, treating as anonymous: {e}"),
                _ => tracing::debug!(%ip, "token not accepted, treating as anonymous: {e}"),
            }
            Identity::Anonymous { ip }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let h = headers(&[
            ("x-forwarded-for", " 1.2.3.4 , 10.0.0.1"),
            ("x-real-ip", "5.6.7.8"),
        ]);
        assert_eq!(client_ip(&h), "1.2.3.4");
    }

    #[test]
    fn falls_back_to_real_ip_then_unknown() {
        assert_eq!(client_ip(&headers(&[("x-real-ip", "5.6.7.8")])), "5.6.7.8");
        assert_eq!(
            client_ip(&headers(&[("x-forwarded-for", ""), ("x-real-ip", "5.6.7.8")])),
            "5.6.7.8"
        );
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn bearer_token_requires_scheme() {
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer abc")])), Some("abc"));
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic abc")])), None);
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer ")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn token_without_auth_service_is_anonymous() {
        let h = headers(&[("authorization", "Bearer abc"), ("x-real-ip", "5.6.7.8")]);
        assert_eq!(
            classify(&h, None).await,
            Identity::Anonymous { ip: "5.6.7.8".into() }
        );
    }

    #[tokio::test]
    async fn unreachable_auth_service_downgrades_to_anonymous() {
        // nothing listens on the discard port
        let auth = AuthClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            None,
            Duration::from_millis(500),
        );
        let h = headers(&[("authorization", "Bearer abc"), ("x-forwarded-for", "1.2.3.4")]);

        assert_eq!(
            classify(&h, Some(&auth)).await,
            Identity::Anonymous { ip: "1.2.3.4".into() }
        );
    }
}

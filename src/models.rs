use serde::{Deserialize, Serialize};
use serde_json::Value;

// Quota block of a successful check
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub limit: u32,
    pub reset_time: u64, // unix seconds, rounded up
}

// 200 response of the check endpoint
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub success: bool,
    pub rate_limit: RateLimitInfo,
    pub authenticated: bool,
    pub body: Option<Value>, // echoed request body, null when absent or not JSON
}

// 429 response
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedBody {
    pub error: &'static str,
    pub message: &'static str,
    pub retry_after: u64,
}

// 429 response as seen by callers
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedReply {
    pub error: String,
    pub message: String,
    pub retry_after: u64,
}

// 500 response
#[derive(Serialize, Debug)]
pub struct InternalErrorBody {
    pub error: &'static str,
}

// Token lookup response from the auth service: JWT-style `sub` or
// user-object style `id`
#[derive(Deserialize, Debug)]
pub struct UserClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl UserClaims {
    pub fn subject(self) -> Option<String> {
        self.sub.or(self.id).filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn check_response_uses_camel_case() {
        let resp = CheckResponse {
            success: true,
            rate_limit: RateLimitInfo {
                remaining: 29,
                limit: 30,
                reset_time: 1_700_000_060,
            },
            authenticated: false,
            body: None,
        };

        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({
                "success": true,
                "rateLimit": { "remaining": 29, "limit": 30, "resetTime": 1_700_000_060u64 },
                "authenticated": false,
                "body": null
            })
        );
    }

    #[test]
    fn claims_accept_sub_or_id() {
        let a: UserClaims = serde_json::from_value(json!({ "sub": "u-1" })).unwrap();
        let b: UserClaims = serde_json::from_value(json!({ "id": "u-2", "email": "x@y.z" })).unwrap();
        let c: UserClaims = serde_json::from_value(json!({ "email": "x@y.z" })).unwrap();
        let d: UserClaims = serde_json::from_value(json!({ "sub": "", "id": "u-3" })).unwrap();

        assert_eq!(a.subject().as_deref(), Some("u-1"));
        assert_eq!(b.subject().as_deref(), Some("u-2"));
        assert!(c.subject().is_none());
        assert!(d.subject().is_none());
    }
}

use crate::auth::AuthClient;
use crate::rate_limit::RateLimiter;
// app's shared state

pub struct AppState {
    pub limiter: RateLimiter,
    pub auth: Option<AuthClient>, // None -> every caller is anonymous
}

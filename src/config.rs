use clap::Parser;
use std::time::Duration;

use crate::rate_limit::{TierLimits, Tiers};

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "quota-gate")]
#[command(about = "Per-caller request quota service with anonymous and authenticated tiers")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Anonymous tier: max requests per window
    #[arg(long, env = "ANON_LIMIT", default_value_t = 30)]
    pub anon_limit: u32,

    // Anonymous tier: window length in milliseconds
    #[arg(long, env = "ANON_WINDOW_MS", default_value_t = 60_000)]
    pub anon_window_ms: u64,

    // Authenticated tier: max requests per window
    #[arg(long, env = "AUTH_LIMIT", default_value_t = 100)]
    pub auth_limit: u32,

    // Authenticated tier: window length in milliseconds
    #[arg(long, env = "AUTH_WINDOW_MS", default_value_t = 60_000)]
    pub auth_window_ms: u64,

    // Base url of the auth service that resolves bearer tokens.
    // Without it every caller is treated as anonymous.
    #[arg(long, env = "SUPABASE_URL")]
    pub auth_url: Option<String>,

    // Public api key sent alongside token lookups
    #[arg(long, env = "SUPABASE_ANON_KEY")]
    pub auth_api_key: Option<String>,

    // Upper bound on a single token lookup, in milliseconds
    #[arg(long, env = "AUTH_TIMEOUT_MS", default_value_t = 3_000)]
    pub auth_timeout_ms: u64,

    // Expired-entry sweep interval in seconds
    #[arg(long, env = "SWEEP_INTERVAL", default_value_t = 60)]
    pub sweep_interval: u64,

    // Soft cap on tracked keys (0 = unbounded)
    #[arg(long, env = "MAX_ENTRIES", default_value_t = 100_000)]
    pub max_entries: usize,
}

impl Args {
    pub fn tiers(&self) -> Tiers {
        Tiers {
            anonymous: TierLimits {
                window: Duration::from_millis(self.anon_window_ms),
                max_requests: self.anon_limit,
            },
            authenticated: TierLimits {
                window: Duration::from_millis(self.auth_window_ms),
                max_requests: self.auth_limit,
            },
        }
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }
}

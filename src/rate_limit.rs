//! Fixed-window request counter keyed by caller identity.
//!
//! One entry per key. The window is anchored at the first request and never
//! extended; the first request seen after `reset_time_ms` opens a new window.
//! State lives in process memory only, so several instances behind a load
//! balancer each enforce their own quota and a restart clears every counter.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::LimiterError;
use crate::metrics::{TRACKED_KEYS, SWEPT_ENTRIES};

// Entries inspected when a new key arrives at capacity
const EVICTION_SAMPLE: usize = 16;

// Rate limit entry - tracks requests per identity key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time_ms: u64,
}

impl RateLimitEntry {
    fn open(now_ms: u64, limits: TierLimits) -> Self {
        Self {
            count: 1,
            reset_time_ms: now_ms.saturating_add(limits.window_ms()),
        }
    }

    fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.reset_time_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Anonymous,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub window: Duration,
    pub max_requests: u32,
}

impl TierLimits {
    fn window_ms(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tiers {
    pub anonymous: TierLimits,
    pub authenticated: TierLimits,
}

impl Tiers {
    pub fn limits(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Anonymous => self.anonymous,
            Tier::Authenticated => self.authenticated,
        }
    }
}

impl Default for Tiers {
    fn default() -> Self {
        Self {
            anonymous: TierLimits {
                window: Duration::from_secs(60),
                max_requests: 30,
            },
            authenticated: TierLimits {
                window: Duration::from_secs(60),
                max_requests: 100,
            },
        }
    }
}

/// Who a request is counted against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated { user_id: String },
    Anonymous { ip: String },
}

impl Identity {
    pub fn key(&self) -> String {
        match self {
            Identity::Authenticated { user_id } => format!("user:{user_id}"),
            Identity::Anonymous { ip } => format!("ip:{ip}"),
        }
    }

    pub fn tier(&self) -> Tier {
        match self {
            Identity::Authenticated { .. } => Tier::Authenticated,
            Identity::Anonymous { .. } => Tier::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
    pub reset_time_ms: u64,
    pub now_ms: u64,
}

impl Decision {
    /// Window end in whole seconds, rounded up.
    pub fn reset_secs(&self) -> u64 {
        self.reset_time_ms.div_ceil(1000)
    }

    /// Seconds until the window ends, rounded up, never negative.
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_time_ms.saturating_sub(self.now_ms).div_ceil(1000)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, RateLimitEntry>>,
    tiers: Tiers,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl RateLimiter {
    pub fn new(tiers: Tiers, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            tiers,
            clock,
            max_entries: 0,
        }
    }

    /// Caps the number of tracked keys. `0` means unbounded.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn tiers(&self) -> &Tiers {
        &self.tiers
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|e| *e)
    }

    /// Counts one request against `identity` and decides whether to admit it.
    ///
    /// Everything from lookup to increment runs under the key's shard lock,
    /// so concurrent callers sharing a key never admit more than
    /// `max_requests` per window.
    pub fn check(&self, identity: &Identity) -> Result<Decision, LimiterError> {
        let limits = self.tiers.limits(identity.tier());
        let now_ms = self.clock.now_ms()?;
        let key = identity.key();

        if self.max_entries > 0 && !self.entries.contains_key(&key) {
            self.make_room(now_ms);
        }

        let decision = match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                let entry = slot.insert(RateLimitEntry::open(now_ms, limits));
                admitted(limits, entry.count, entry.reset_time_ms, now_ms)
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if entry.is_expired(now_ms) {
                    *entry = RateLimitEntry::open(now_ms, limits);
                    admitted(limits, entry.count, entry.reset_time_ms, now_ms)
                } else {
                    entry.count = entry.count.saturating_add(1);
                    if entry.count > limits.max_requests {
                        Decision {
                            allowed: false,
                            remaining: 0,
                            limit: limits.max_requests,
                            reset_time_ms: entry.reset_time_ms,
                            now_ms,
                        }
                    } else {
                        admitted(limits, entry.count, entry.reset_time_ms, now_ms)
                    }
                }
            }
        };

        TRACKED_KEYS.set(self.entries.len() as f64);
        Ok(decision)
    }

    /// Drops every entry whose window has ended. Returns how many went.
    pub fn sweep(&self) -> Result<usize, LimiterError> {
        let now_ms = self.clock.now_ms()?;
        Ok(self.sweep_at(now_ms))
    }

    fn sweep_at(&self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now_ms));
        let removed = before.saturating_sub(self.entries.len());
        SWEPT_ENTRIES.inc_by(removed as f64);
        TRACKED_KEYS.set(self.entries.len() as f64);
        removed
    }

    // Must not be called while holding an entry guard. Only a bounded
    // sample is inspected; full passes are the sweeper's job. Returns how
    // many entries were looked at.
    fn make_room(&self, now_ms: u64) -> usize {
        if self.entries.len() < self.max_entries {
            return 0;
        }

        let sample: Vec<(String, u64)> = self
            .entries
            .iter()
            .take(EVICTION_SAMPLE)
            .map(|e| (e.key().clone(), e.value().reset_time_ms))
            .collect();

        let mut expired = 0;
        for (key, reset_time_ms) in &sample {
            if now_ms > *reset_time_ms
                && self.entries.remove_if(key, |_, e| e.is_expired(now_ms)).is_some()
            {
                expired += 1;
            }
        }

        if expired > 0 {
            SWEPT_ENTRIES.inc_by(expired as f64);
        } else if let Some((key, _)) = sample.iter().min_by_key(|(_, reset)| *reset) {
            tracing::debug!(%key, "rate limit table full, evicting earliest sampled window");
            self.entries.remove(key);
        }
        sample.len()
    }
}

fn admitted(limits: TierLimits, count: u32, reset_time_ms: u64, now_ms: u64) -> Decision {
    Decision {
        allowed: true,
        remaining: limits.max_requests.saturating_sub(count),
        limit: limits.max_requests,
        reset_time_ms,
        now_ms,
    }
}

// Periodic sweep of expired entries
pub async fn sweeper(limiter: RateLimiter, every: Duration) {
    let mut interval = tokio::time::interval(every);

    tracing::info!(?every, "rate limit sweeper started");

    loop {
        interval.tick().await;

        match limiter.sweep() {
            Ok(0) => {}
            Ok(removed) => {
                tracing::debug!(removed, remaining = limiter.len(), "swept expired rate limit entries")
            }
            Err(e) => tracing::error!("rate limit sweep failed: {e}"),
        }
    }
}

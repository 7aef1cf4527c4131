use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref CHECKS_TOTAL: Counter =
        register_counter!("quota_gate_checks_total", "Total number of rate limit checks").unwrap();
    pub static ref REJECTED_TOTAL: Counter =
        register_counter!("quota_gate_rejected_total", "Requests rejected for exceeding quota").unwrap();
    pub static ref AUTH_DOWNGRADES: Counter =
        register_counter!("quota_gate_auth_downgrades_total", "Bearer tokens that could not be resolved").unwrap();
    pub static ref AUTH_LATENCY: Histogram = register_histogram!(
        "quota_gate_auth_latency_seconds",
        "Token resolution latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_KEYS: Gauge =
        register_gauge!("quota_gate_tracked_keys", "Current number of tracked identity keys").unwrap();
    pub static ref SWEPT_ENTRIES: Counter =
        register_counter!("quota_gate_swept_entries_total", "Expired entries removed from the table").unwrap();
}

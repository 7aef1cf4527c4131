mod health;
mod metrics;
mod check;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use check::{check_handler, preflight_handler};

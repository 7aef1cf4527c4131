use clap::Parser; // for cli
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quota_gate::auth::AuthClient;
use quota_gate::clock::SystemClock;
use quota_gate::config::Args;
use quota_gate::rate_limit::{RateLimiter, sweeper};
use quota_gate::state::AppState;
use quota_gate::{CHECK_PATH, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quota_gate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments
    let args = Args::parse();

    let limiter =
        RateLimiter::new(args.tiers(), Arc::new(SystemClock)).with_max_entries(args.max_entries);
    let tiers = *limiter.tiers();

    let auth = args.auth_url.as_deref().map(|url| {
        AuthClient::new(
            reqwest::Client::new(),
            url,
            args.auth_api_key.clone(),
            args.auth_timeout(),
        )
    });

    // spawn the background sweeper
    tokio::spawn(sweeper(limiter.clone(), args.sweep_interval()));

    let state = Arc::new(AppState {
        limiter,
        auth,
    });
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("quota gate listening on http://{}{}", addr, CHECK_PATH);
    tracing::info!(
        "anonymous: {} requests per {:?}, authenticated: {} requests per {:?}",
        tiers.anonymous.max_requests,
        tiers.anonymous.window,
        tiers.authenticated.max_requests,
        tiers.authenticated.window
    );
    match &args.auth_url {
        Some(url) => tracing::info!("resolving bearer tokens against {} (timeout {:?})", url, args.auth_timeout()),
        None => tracing::warn!("no auth url configured, all callers are anonymous"),
    }
    tracing::info!("counters are in-memory and per instance; a restart clears them");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use switchboard::application::Switchboard;
use switchboard::config::Config;
use switchboard::infrastructure::telnyx::{TelephonyApi, TelnyxClient, WebhookVerifier};
use switchboard::interface::api::{build_router, init_metrics, AppState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Switchboard");

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;
    info!("Configuration loaded: {:?}", config);

    let api: Option<Arc<dyn TelephonyApi>> = TelnyxClient::from_config(&config.telnyx)
        .context("failed to build Telnyx client")?
        .map(|client| Arc::new(client) as Arc<dyn TelephonyApi>);

    let verifier = WebhookVerifier::new(
        config.telnyx.public_key.as_deref(),
        config.webhook.allow_unsigned,
        config.webhook.tolerance_secs,
    )
    .context("invalid TELNYX_PUBLIC_KEY")?;
    if !verifier.is_enforcing() {
        if config.webhook.allow_unsigned {
            warn!("TELNYX_PUBLIC_KEY is not set; accepting UNSIGNED webhooks");
        } else {
            warn!("TELNYX_PUBLIC_KEY is not set; all webhooks will be rejected with 401");
        }
    }

    info!("Initializing Prometheus metrics exporter");
    let prometheus_handle = init_metrics().context("failed to install metrics recorder")?;

    let switchboard = Switchboard::start(&config, api);
    let state = AppState::new(
        &switchboard,
        verifier,
        Duration::from_secs(config.sse.keep_alive_secs),
        Some(prometheus_handle),
    );
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("REST API server listening on {}", addr);

    // Open SSE streams would otherwise keep graceful shutdown waiting.
    let broadcaster = switchboard.broadcaster.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            broadcaster.close_all();
        })
        .await?;

    info!("Shutting down...");
    switchboard.shutdown(Duration::from_secs(5)).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use linebot_core::HttpMessagingApi;
use linebot_ingress::{AppConfig, AppState, Dispatcher, router};
use linebot_telemetry::{TelemetryConfig, init_telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env("linebot-ingress", env!("CARGO_PKG_VERSION"));
    init_telemetry(telemetry)?;

    let config = AppConfig::from_env()
        .inspect_err(|err| tracing::error!(error = %err, "invalid configuration"))
        .context("load configuration")?;
    tracing::info!(config = ?config, "configuration loaded");

    let http = reqwest::Client::builder()
        .user_agent(concat!("linebot-ingress/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")?;
    let api = HttpMessagingApi::new(
        http,
        config.channel_access_token.clone(),
        Some(config.api_base.clone()),
    );
    let state = AppState::new(Arc::new(api), Dispatcher::from_config(&config));
    let app = router(state, config.channel_secret.clone());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    tracing::info!(
        policy = config.delivery_policy.as_str(),
        "linebot-ingress listening on {}",
        config.bind
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("linebot-ingress stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

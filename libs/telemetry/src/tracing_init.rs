use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing_subscriber::layer::Layer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::TelemetryConfig;

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_telemetry(cfg: TelemetryConfig) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    let fmt_layer = if cfg.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let env_filter = EnvFilter::try_new(&cfg.filter)
        .with_context(|| format!("invalid log filter {:?}", cfg.filter))?;

    // another subscriber may already be installed (tests, embedding)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .ok();

    INIT.set(()).ok();
    tracing::info!(
        service = %cfg.service_name,
        version = %cfg.service_version,
        json = cfg.json_logs,
        "telemetry initialised"
    );
    Ok(())
}

//! Logging setup shared by the bot's binaries.
//! Installs a `tracing` subscriber with an `EnvFilter` and a JSON or text
//! formatter chosen from the environment.

mod config;
mod tracing_init;

pub use config::{DEFAULT_FILTER, TelemetryConfig};
pub use tracing_init::init_telemetry;

use std::env;

pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub json_logs: bool,
    /// `EnvFilter` directives; `RUST_LOG` when set.
    pub filter: String,
}

impl TelemetryConfig {
    pub fn from_env(default_service_name: &str, default_service_version: &str) -> Self {
        Self::from_lookup(default_service_name, default_service_version, |key| {
            env::var(key).ok()
        })
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(
        default_service_name: &str,
        default_service_version: &str,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_name =
            lookup("OTEL_SERVICE_NAME").unwrap_or_else(|| default_service_name.to_string());
        let service_version = lookup("OTEL_SERVICE_VERSION")
            .unwrap_or_else(|| default_service_version.to_string());
        let json_logs = lookup("LOG_FORMAT")
            .map(|v| !matches!(v.to_lowercase().as_str(), "text" | "pretty" | "plain"))
            .unwrap_or(true);
        let filter = lookup("RUST_LOG")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        Self {
            service_name,
            service_version,
            json_logs,
            filter,
        }
    }
}

//! Process configuration, read once at startup.

use std::{fmt, net::AddrParseError, net::SocketAddr};

use linebot_core::DEFAULT_API_BASE;
use thiserror::Error;

use crate::dispatch::DeliveryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://line-bot-six-steel.vercel.app";
pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_MULTICAST_EXTRAS: &str = "@895ibvph";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("BASE_URL must be an absolute https url, got `{0}`")]
    InsecureBaseUrl(String),
    #[error("LINE_API_BASE must be an absolute http(s) url, got `{0}`")]
    InvalidApiBase(String),
    #[error("BIND `{value}` is not a socket address")]
    InvalidBind {
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("DELIVERY_POLICY `{0}` is not one of abort, best_effort")]
    InvalidPolicy(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub channel_secret: String,
    pub channel_access_token: String,
    /// Static asset root without a trailing slash.
    pub base_url: String,
    pub api_base: String,
    pub multicast_extras: Vec<String>,
    pub delivery_policy: DeliveryPolicy,
    pub bind: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// ```
    /// use linebot_ingress::config::AppConfig;
    ///
    /// let cfg = AppConfig::from_lookup(|key| match key {
    ///     "CHANNEL_SECRET" => Some("s3cret".into()),
    ///     "CHANNEL_ACCESS_TOKEN" => Some("token".into()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(cfg.bind.port(), 5000);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let channel_secret = get("CHANNEL_SECRET").ok_or(ConfigError::Missing("CHANNEL_SECRET"))?;
        let channel_access_token =
            get("CHANNEL_ACCESS_TOKEN").ok_or(ConfigError::Missing("CHANNEL_ACCESS_TOKEN"))?;

        let base_url = get("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        let api_base = get("LINE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
            return Err(ConfigError::InvalidApiBase(api_base));
        }

        let multicast_extras = parse_recipients(
            &get("MULTICAST_EXTRA_RECIPIENTS").unwrap_or_else(|| DEFAULT_MULTICAST_EXTRAS.into()),
        );

        let delivery_policy = match get("DELIVERY_POLICY") {
            Some(raw) => raw.parse::<DeliveryPolicy>()?,
            None => DeliveryPolicy::default(),
        };

        let bind_raw = get("BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|source| ConfigError::InvalidBind {
                value: bind_raw.clone(),
                source,
            })?;

        Ok(Self {
            channel_secret,
            channel_access_token,
            base_url,
            api_base,
            multicast_extras,
            delivery_policy,
            bind,
        })
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("channel_secret", &"<redacted>")
            .field("channel_access_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("api_base", &self.api_base)
            .field("multicast_extras", &self.multicast_extras)
            .field("delivery_policy", &self.delivery_policy)
            .field("bind", &self.bind)
            .finish()
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim_end_matches('/');
    match trimmed.strip_prefix("https://") {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ConfigError::InsecureBaseUrl(raw.to_string())),
    }
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

//! LINE webhook receiver.
//!
//! Verifies provider callbacks, routes text messages by keyword, and answers
//! through the messaging API with replies, pushes, and a multicast.
pub mod config;
pub mod content;
pub mod dispatch;
pub mod webhook;

pub use config::{AppConfig, ConfigError};
pub use dispatch::{
    DeliveryPolicy, DispatchError, DispatchReport, Dispatcher, Handling, KEYWORD_ROUTES, Route,
};
pub use webhook::{AppState, WebhookError, router};

pub mod reqid;
pub mod security;
pub mod telemetry;

pub use reqid::*;
pub use security::*;
pub use telemetry::*;

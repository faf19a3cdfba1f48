//! Core contracts for the LINE webhook bot.
//!
//! Inbound webhook events, the outbound message model (including typed Flex
//! layouts), and the [`MessagingApi`] seam used to reply, push, and multicast.
pub mod client;
pub mod event;
pub mod flex;
pub mod message;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use client::*;
pub use event::*;
pub use flex::*;
pub use message::*;

/// Returns the semantic version advertised by this crate.
///
/// ```
/// assert_eq!(linebot_core::version(), "0.1.0");
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

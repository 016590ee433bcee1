//! Feedbot Channels: chat transports.
//!
//! - **base**: the `Channel` trait every transport implements
//! - **manager**: `ChannelManager`, lifecycle plus the single outbound
//!   dispatcher that drains the delivery queue
//! - **formatting**: splitting text to a transport's length limit
//! - **telegram**: Telegram long polling (feature `telegram`)

pub mod base;
pub mod formatting;
pub mod manager;

#[cfg(feature = "telegram")]
pub mod telegram;

pub use base::Channel;
pub use manager::ChannelManager;

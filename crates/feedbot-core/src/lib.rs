//! Feedbot Core: shared plumbing for every other crate.
//!
//! - **bus**: bounded inbound/outbound message queues between the chat
//!   transport, the command loop and the poller
//! - **config**: typed configuration loaded from `~/.feedbot/config.json`
//!   plus environment overrides
//! - **types**: small shared aliases
//! - **utils**: data paths and sender matching

pub mod bus;
pub mod config;
pub mod types;
pub mod utils;

pub use types::ChatId;

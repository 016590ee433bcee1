//! Feedbot Commands: turns chat messages into subscription changes.
//!
//! - **command**: parsing message text into a [`Command`]
//! - **command_loop**: consumes the inbound bus, applies commands to the
//!   shared state and publishes replies

pub mod command;
pub mod command_loop;

pub use command::Command;
pub use command_loop::CommandLoop;

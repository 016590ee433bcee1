//! Message bus: bounded queues connecting transports, commands and the poller.

pub mod queue;
pub mod types;

pub use queue::MessageBus;
pub use types::{InboundMessage, OutboundMessage};

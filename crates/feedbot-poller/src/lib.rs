//! Feedbot Poller: fetch every feed, find what each chat has not seen,
//! and queue it for delivery.
//!
//! - **cycle**: one fan-out/fan-in pass over all feeds (`PollCycle`)
//! - **service**: timer loop with manual trigger and persistence (`PollService`)

pub mod cycle;
pub mod service;

pub use cycle::{CycleReport, PollCycle};
pub use service::PollService;

//! Daemon Core - orchestrator, triggers, and wiring
//!
//! The daemon is the long-running process that:
//! - Runs one verification/issuance pass at a time over the domain list
//! - Starts passes at startup, on a fixed interval, and when the list changes
//! - Reports per-pass outcomes to the log

pub mod context;
pub mod orchestrator;
pub mod report;
pub mod trigger;

pub use context::*;
pub use orchestrator::*;
pub use report::*;
pub use trigger::*;

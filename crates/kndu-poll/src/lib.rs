//! Poll scheduling for kndu
//!
//! This crate runs the fetch, build and render cycle on a timer, funnels
//! errors into a single sink task, and prints setup status messages.

mod scheduler;
mod sink;
mod status;

pub use scheduler::{
    ErrorPolicy, POLL_PERIOD, PollError, PollMode, PollOutcome, PollScheduler, SchedulerState,
    StopReason,
};
pub use sink::spawn_error_sink;
pub use status::{StatusMessage, StatusPrinter};

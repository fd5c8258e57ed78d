//! Logging utilities for output and progress tracking
//!
//! Stage-level log lines and the progress bars shown while detectors run.

pub mod log;
pub mod progress;

pub use log::{log_stage_complete, log_stage_skipped, log_stage_start};
pub use progress::{create_progress_bar, finish_progress_bar};

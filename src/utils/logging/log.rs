//! Logging utilities
//!
//! Standardized log lines for analysis stages.

use std::time::Duration;

/// Log the start of an analysis stage
///
/// # Arguments
/// * `stage` - Name of the stage
/// * `items` - Number of items the stage will look at
pub fn log_stage_start(stage: &str, items: usize) {
    log::info!("Starting {stage} on {items} items");
}

/// Log the completion of an analysis stage
///
/// # Arguments
/// * `stage` - Name of the stage
/// * `findings` - Number of findings the stage produced
/// * `elapsed` - Time spent in the stage
pub fn log_stage_complete(stage: &str, findings: usize, elapsed: Duration) {
    log::info!("Finished {stage}: {findings} findings in {elapsed:?}");
}

/// Log a stage that could not run
pub fn log_stage_skipped(stage: &str, reason: &str) {
    log::warn!("Skipping {stage}: {reason}");
}

//! Shared utilities: Arrow column access, date parsing, logging and
//! descriptive statistics.

pub mod arrow;
pub mod date;
pub mod logging;
pub mod stats;

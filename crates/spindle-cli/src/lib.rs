//! Spindle CLI - job loading and JSON output for the `spindlesync` binary

pub mod job;
pub mod output;

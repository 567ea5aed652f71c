//! JSON output formatting

use anyhow::{Context, Result};
use serde::Serialize;
use spindle_core::Refined;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct RefinementOutput {
    pub status: &'static str,
    pub times: Vec<f64>,
    pub freqs: Vec<f64>,
    pub candidates_evaluated: usize,
    pub processing_time_seconds: f64,
}

impl RefinementOutput {
    pub fn new(refined: Refined, elapsed: Duration) -> Self {
        let candidates_evaluated = refined.candidates;
        let (times, freqs) = refined.anchors.into_parts();
        Self {
            status: "success",
            times,
            freqs,
            candidates_evaluated,
            processing_time_seconds: elapsed.as_secs_f64(),
        }
    }
}

/// Print the result as JSON, or write it to `path` when given
pub fn write_json(result: &RefinementOutput, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    match path {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write output file: {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

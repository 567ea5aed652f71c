//! Refinement job files
//!
//! A job carries an already computed magnitude spectrogram, the grid it was
//! sampled on, and the nominal anchors taken from the machining program.

use anyhow::{Context, Result};
use serde::Deserialize;
use spindle_core::{Anchors, Grid, Spectrogram};
use std::path::Path;

/// Grid dimensions as written in the job file
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct JobGrid {
    pub n_time: usize,
    pub n_freq: usize,
    /// Recording length in seconds
    pub time_max: f64,
    /// Upper frequency bound in Hz
    pub freq_max: f64,
}

#[derive(Debug, Deserialize)]
pub struct Job {
    pub grid: JobGrid,
    /// Rows are frequency bins, columns are time frames
    pub spectrogram: Vec<Vec<f32>>,
    pub anchors: Anchors,
}

impl Job {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid job file: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse job JSON")
    }

    /// Validated grid, spectrogram and anchors
    pub fn into_parts(self) -> Result<(Grid, Spectrogram, Anchors)> {
        let JobGrid {
            n_time,
            n_freq,
            time_max,
            freq_max,
        } = self.grid;
        let grid = Grid::new(n_time, n_freq, time_max, freq_max)?;
        let spectrogram = Spectrogram::from_rows(self.spectrogram)?;
        Ok((grid, spectrogram, self.anchors))
    }
}

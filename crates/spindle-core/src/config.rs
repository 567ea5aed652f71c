//! Tuning of the anchor refinement
//!
//! TOML-loadable; every key is optional and falls back to the defaults the
//! refinement was tuned with on milling recordings.

use crate::error::{Result, SyncError};
use crate::grid::Grid;
use crate::piecewise::{RampSlopes, SegmentShaper};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub mask: MaskConfig,
    #[serde(default)]
    pub shape: ShapeConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub band: BandConfig,
}

/// Corridor tolerance
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MaskConfig {
    /// Time oversampling of the curve
    #[serde(default = "default_upsample_factor")]
    pub upsample_factor: usize,
    /// Full time window, in grid columns
    #[serde(default = "default_window_cells")]
    pub time_window_cells: f64,
    /// Full frequency window, in grid rows
    #[serde(default = "default_window_cells")]
    pub freq_window_cells: f64,
    /// Score energy at twice the trajectory frequency as well
    #[serde(default = "default_true")]
    pub use_first_harmonic: bool,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            upsample_factor: default_upsample_factor(),
            time_window_cells: default_window_cells(),
            freq_window_cells: default_window_cells(),
            use_first_harmonic: default_true(),
        }
    }
}

fn default_upsample_factor() -> usize {
    10
}
fn default_window_cells() -> f64 {
    5.0
}
fn default_true() -> bool {
    true
}

/// Segment shaping strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaperKind {
    Linear,
    Plateau,
    #[default]
    Bended,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ShapeConfig {
    #[serde(default)]
    pub shaper: ShaperKind,
    /// Spin-up slope magnitude in Hz/s
    #[serde(default = "default_ramp_slope")]
    pub ramp_up_slope: f64,
    /// Spin-down slope magnitude in Hz/s
    #[serde(default = "default_ramp_slope")]
    pub ramp_down_slope: f64,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            shaper: ShaperKind::default(),
            ramp_up_slope: default_ramp_slope(),
            ramp_down_slope: default_ramp_slope(),
        }
    }
}

fn default_ramp_slope() -> f64 {
    60.0
}

/// Resolutions and windows of the three refinement passes
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Candidates per time cell in the joint time pass
    #[serde(default = "default_global_time_resolution")]
    pub global_time_resolution: f64,
    /// Half width of the per-anchor frequency window in Hz
    #[serde(default = "default_freq_half_width")]
    pub freq_half_width: f64,
    #[serde(default = "default_resolution")]
    pub freq_resolution: f64,
    #[serde(default = "default_resolution")]
    pub time_resolution: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            global_time_resolution: default_global_time_resolution(),
            freq_half_width: default_freq_half_width(),
            freq_resolution: default_resolution(),
            time_resolution: default_resolution(),
        }
    }
}

fn default_global_time_resolution() -> f64 {
    0.2
}
fn default_freq_half_width() -> f64 {
    30.0
}
fn default_resolution() -> f64 {
    1.0
}

/// Session-wide frequency band around the anchors
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BandConfig {
    /// Margin in Hz below the lowest and above the highest harmonic
    #[serde(default = "default_band_buffer")]
    pub buffer: f64,
    /// The band always reaches down to and up to at least this frequency
    #[serde(default = "default_band_floor")]
    pub floor: f64,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            buffer: default_band_buffer(),
            floor: default_band_floor(),
        }
    }
}

fn default_band_buffer() -> f64 {
    15.0
}
fn default_band_floor() -> f64 {
    100.0
}

fn positive(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(SyncError::config(format!(
            "{} must be positive and finite, got {}",
            name, value
        )));
    }
    Ok(())
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(SyncError::config(format!(
            "{} must be finite and >= 0, got {}",
            name, value
        )));
    }
    Ok(())
}

impl SyncConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: SyncConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.mask.upsample_factor == 0 {
            return Err(SyncError::config("upsample_factor must be > 0"));
        }
        non_negative("time_window_cells", self.mask.time_window_cells)?;
        non_negative("freq_window_cells", self.mask.freq_window_cells)?;
        positive("ramp_up_slope", self.shape.ramp_up_slope)?;
        positive("ramp_down_slope", self.shape.ramp_down_slope)?;
        positive("global_time_resolution", self.search.global_time_resolution)?;
        positive("freq_half_width", self.search.freq_half_width)?;
        positive("freq_resolution", self.search.freq_resolution)?;
        positive("time_resolution", self.search.time_resolution)?;
        non_negative("band buffer", self.band.buffer)?;
        non_negative("band floor", self.band.floor)?;
        Ok(())
    }

    /// Tolerance windows (seconds, Hz) on `grid`
    pub fn tolerance(&self, grid: &Grid) -> (f64, f64) {
        (
            self.mask.time_window_cells * grid.time_step(),
            self.mask.freq_window_cells * grid.freq_step(),
        )
    }

    pub fn shaper(&self) -> Result<SegmentShaper> {
        Ok(match self.shape.shaper {
            ShaperKind::Linear => SegmentShaper::Linear,
            ShaperKind::Plateau => SegmentShaper::Plateau,
            ShaperKind::Bended => SegmentShaper::Bended(RampSlopes::new(
                self.shape.ramp_up_slope,
                self.shape.ramp_down_slope,
            )?),
        })
    }
}

//! Sampling grid of the spectrogram
//!
//! Converts between physical (time, frequency) coordinates and matrix
//! indices. Cell sizes are `max / count` on each axis.

use crate::error::{Result, SyncError};
use serde::Serialize;

/// Rectangular time x frequency domain of a spectrogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Grid {
    n_time: usize,
    n_freq: usize,
    time_max: f64,
    freq_max: f64,
}

impl Grid {
    pub fn new(n_time: usize, n_freq: usize, time_max: f64, freq_max: f64) -> Result<Self> {
        if n_time == 0 || n_freq == 0 {
            return Err(SyncError::config(format!(
                "grid counts must be positive, got n_time={} n_freq={}",
                n_time, n_freq
            )));
        }
        if !(time_max.is_finite() && time_max > 0.0) {
            return Err(SyncError::config(format!(
                "time_max must be positive and finite, got {}",
                time_max
            )));
        }
        if !(freq_max.is_finite() && freq_max > 0.0) {
            return Err(SyncError::config(format!(
                "freq_max must be positive and finite, got {}",
                freq_max
            )));
        }
        Ok(Self {
            n_time,
            n_freq,
            time_max,
            freq_max,
        })
    }

    pub fn n_time(&self) -> usize {
        self.n_time
    }

    pub fn n_freq(&self) -> usize {
        self.n_freq
    }

    pub fn time_max(&self) -> f64 {
        self.time_max
    }

    pub fn freq_max(&self) -> f64 {
        self.freq_max
    }

    /// Seconds per time column
    pub fn time_step(&self) -> f64 {
        self.time_max / self.n_time as f64
    }

    /// Hz per frequency row
    pub fn freq_step(&self) -> f64 {
        self.freq_max / self.n_freq as f64
    }

    /// Physical time of every column
    pub fn time_samples(&self) -> Vec<f64> {
        let step = self.time_step();
        (0..self.n_time).map(|k| k as f64 * step).collect()
    }

    /// Physical frequency of every row
    pub fn freq_samples(&self) -> Vec<f64> {
        let step = self.freq_step();
        (0..self.n_freq).map(|k| k as f64 * step).collect()
    }

    pub fn time_to_index(&self, time: f64, clip: bool) -> i64 {
        to_index(time, self.time_max, self.n_time, clip)
    }

    pub fn freq_to_index(&self, freq: f64, clip: bool) -> i64 {
        to_index(freq, self.freq_max, self.n_freq, clip)
    }
}

/// Floor-divide `value` by the cell size `axis_max / axis_count`.
///
/// With `clip` the result is clamped to `[0, axis_count]`. Without it the
/// index may be negative or past the end, which the mask builder relies on
/// for corridors leaving the grid.
pub fn to_index(value: f64, axis_max: f64, axis_count: usize, clip: bool) -> i64 {
    let cell = axis_max / axis_count as f64;
    let raw = (value / cell).floor();
    let idx = if raw.is_nan() {
        0
    } else {
        // `as` saturates for values beyond i64
        raw as i64
    };
    if clip {
        idx.clamp(0, axis_count as i64)
    } else {
        idx
    }
}

/// Elementwise [`to_index`]
pub fn to_indices(values: &[f64], axis_max: f64, axis_count: usize, clip: bool) -> Vec<i64> {
    values
        .iter()
        .map(|&v| to_index(v, axis_max, axis_count, clip))
        .collect()
}

/// Lower edge of the cell `index`
pub fn to_value(index: i64, axis_max: f64, axis_count: usize) -> f64 {
    index as f64 * (axis_max / axis_count as f64)
}

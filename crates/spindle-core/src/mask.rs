//! Tolerance corridor around a frequency curve
//!
//! Approximates a rectangular dilation of the curve by combining 1D
//! operations: the curve is oversampled in time, offset up and down by half
//! the frequency window, shifted back and forth by half the time window, and
//! the elementwise min/max of all variants gives the corridor's lower and
//! upper frequency index per column.

use crate::error::{Result, SyncError};
use crate::grid::{to_index, to_indices, Grid};
use crate::slicer::Slice;
use crate::spectrogram::Mask;

/// Default time oversampling of the curve
pub const DEFAULT_UPSAMPLE_FACTOR: usize = 10;

/// Shifts a signal in time; vacated samples repeat the edge value
#[derive(Debug, Clone, Copy)]
struct TimeShifter {
    shift: usize,
}

impl TimeShifter {
    /// Back in time (left)
    fn neg(&self, x: &[i64]) -> Vec<i64> {
        let last = x.len().saturating_sub(1);
        (0..x.len()).map(|i| x[(i + self.shift).min(last)]).collect()
    }

    /// Forward in time (right)
    fn pos(&self, x: &[i64]) -> Vec<i64> {
        (0..x.len()).map(|i| x[i.saturating_sub(self.shift)]).collect()
    }
}

/// Builds boolean corridors over sliced grid regions
#[derive(Debug, Clone)]
pub struct MaskBuilder {
    grid: Grid,
    time_window: f64,
    freq_window: f64,
    upsample_factor: usize,
}

impl MaskBuilder {
    /// `time_window` (s) and `freq_window` (Hz) are full widths.
    pub fn new(grid: Grid, time_window: f64, freq_window: f64) -> Result<Self> {
        Self::with_upsample_factor(grid, time_window, freq_window, DEFAULT_UPSAMPLE_FACTOR)
    }

    pub fn with_upsample_factor(
        grid: Grid,
        time_window: f64,
        freq_window: f64,
        upsample_factor: usize,
    ) -> Result<Self> {
        if !(time_window.is_finite() && time_window >= 0.0) {
            return Err(SyncError::config(format!(
                "time_window must be finite and >= 0, got {}",
                time_window
            )));
        }
        if !(freq_window.is_finite() && freq_window >= 0.0) {
            return Err(SyncError::config(format!(
                "freq_window must be finite and >= 0, got {}",
                freq_window
            )));
        }
        if upsample_factor == 0 {
            return Err(SyncError::config("upsample_factor must be > 0"));
        }
        Ok(Self {
            grid,
            time_window,
            freq_window,
            upsample_factor,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn time_window(&self) -> f64 {
        self.time_window
    }

    pub fn freq_window(&self) -> f64 {
        self.freq_window
    }

    /// Linear interpolation at `len * factor` positions `i / factor`, so that
    /// every `factor`-th sample is a native column. Positions past the last
    /// column hold its value.
    fn upsample(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len() * self.upsample_factor;
        let factor = self.upsample_factor as f64;
        (0..n)
            .map(|i| {
                let pos = i as f64 / factor;
                let lo = (pos.floor() as usize).min(x.len() - 1);
                let hi = (lo + 1).min(x.len() - 1);
                let frac = pos - lo as f64;
                x[lo] + (x[hi] - x[lo]) * frac
            })
            .collect()
    }

    fn freq_indices(&self, curve: &[f64], offset: f64) -> Vec<i64> {
        let shifted: Vec<f64> = curve.iter().map(|f| f + offset).collect();
        to_indices(&shifted, self.grid.freq_max(), self.grid.n_freq(), false)
    }

    /// Corridor of `curve` over `slice`.
    ///
    /// `curve` holds one frequency per time column, either for the whole grid
    /// or only for the slice's columns.
    pub fn build(&self, curve: &[f64], slice: &Slice) -> Result<Mask> {
        if curve.is_empty() {
            return Ok(Mask::empty(slice.height(), 0));
        }
        let sliced = if curve.len() == self.grid.n_time() {
            &curve[slice.x_range()]
        } else if curve.len() == slice.width() {
            curve
        } else {
            return Err(SyncError::shape(format!(
                "curve must have the grid length {} or the slice width {}, got {}",
                self.grid.n_time(),
                slice.width(),
                curve.len()
            )));
        };

        let mut mask = Mask::empty(slice.height(), sliced.len());
        let (lower, upper) = self.envelope(sliced);

        for (col, (&lo, &hi)) in lower.iter().zip(&upper).enumerate() {
            for (row, y) in slice.y_range().enumerate() {
                let y = y as i64;
                if y >= lo && y <= hi {
                    mask.set(row, col, true);
                }
            }
        }
        Ok(mask)
    }

    /// Lower and upper corridor bound (frequency index) per native column
    fn envelope(&self, curve: &[f64]) -> (Vec<i64>, Vec<i64>) {
        let upsampled = self.upsample(curve);
        let half_freq = self.freq_window / 2.0;

        let center = self.freq_indices(&upsampled, 0.0);
        let plus = self.freq_indices(&upsampled, half_freq);
        let minus = self.freq_indices(&upsampled, -half_freq);

        let shift = to_index(
            self.time_window / 2.0,
            self.grid.time_max(),
            self.grid.n_time(),
            false,
        )
        .max(0) as usize
            * self.upsample_factor;
        let shifter = TimeShifter { shift };

        let variants = [
            shifter.pos(&plus),
            shifter.neg(&plus),
            shifter.pos(&minus),
            shifter.neg(&minus),
            shifter.pos(&center),
            shifter.neg(&center),
            plus,
            minus,
        ];

        let lower: Vec<i64> = (0..upsampled.len())
            .step_by(self.upsample_factor)
            .map(|i| variants.iter().map(|v| v[i]).min().unwrap_or(i64::MAX))
            .collect();
        let upper: Vec<i64> = (0..upsampled.len())
            .step_by(self.upsample_factor)
            .map(|i| variants.iter().map(|v| v[i]).max().unwrap_or(i64::MIN))
            .collect();
        (lower, upper)
    }
}

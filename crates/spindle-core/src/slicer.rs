//! Sub-rectangle selection on the time x frequency grid
//!
//! A session-wide (global) restriction and a per-call (local) restriction are
//! merged by intersection. Either may be given as indices or as physical
//! values; values are converted with the grid's cell size and clipped to the
//! axis.

use crate::error::{Result, SyncError};
use crate::grid::{to_index, Grid};
use crate::spectrogram::Spectrogram;
use serde::{Deserialize, Serialize};
use std::ops::Range;

fn check_bounds<T: PartialOrd + std::fmt::Debug>(
    axis: &str,
    from: Option<T>,
    to: Option<T>,
) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if !(from < to) {
            return Err(SyncError::config(format!(
                "from_{axis} ({:?}) must be smaller than to_{axis} ({:?})",
                from, to
            )));
        }
    }
    Ok(())
}

/// Slice bounds given as matrix indices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSliceConfig {
    pub from_x: Option<usize>,
    pub to_x: Option<usize>,
    pub from_y: Option<usize>,
    pub to_y: Option<usize>,
}

impl IndexSliceConfig {
    pub fn new(
        from_x: Option<usize>,
        to_x: Option<usize>,
        from_y: Option<usize>,
        to_y: Option<usize>,
    ) -> Result<Self> {
        let cfg = Self {
            from_x,
            to_x,
            from_y,
            to_y,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        check_bounds("x", self.from_x, self.to_x)?;
        check_bounds("y", self.from_y, self.to_y)
    }
}

/// Slice bounds given as physical values (seconds, Hz)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueSliceConfig {
    pub from_x: Option<f64>,
    pub to_x: Option<f64>,
    pub from_y: Option<f64>,
    pub to_y: Option<f64>,
}

impl ValueSliceConfig {
    pub fn new(
        from_x: Option<f64>,
        to_x: Option<f64>,
        from_y: Option<f64>,
        to_y: Option<f64>,
    ) -> Result<Self> {
        let cfg = Self {
            from_x,
            to_x,
            from_y,
            to_y,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Restrict the time axis only
    pub fn time(from: f64, to: f64) -> Result<Self> {
        Self::new(Some(from), Some(to), None, None)
    }

    /// Restrict the frequency axis only
    pub fn frequency(from: f64, to: f64) -> Result<Self> {
        Self::new(None, None, Some(from), Some(to))
    }

    pub fn validate(&self) -> Result<()> {
        check_bounds("x", self.from_x, self.to_x)?;
        check_bounds("y", self.from_y, self.to_y)
    }

    /// Convert to indices with clipping to `[0, count]`
    pub fn to_index_config(&self, grid: &Grid) -> IndexSliceConfig {
        let time = |v: Option<f64>| {
            v.map(|v| to_index(v, grid.time_max(), grid.n_time(), true) as usize)
        };
        let freq = |v: Option<f64>| {
            v.map(|v| to_index(v, grid.freq_max(), grid.n_freq(), true) as usize)
        };
        IndexSliceConfig {
            from_x: time(self.from_x),
            to_x: time(self.to_x),
            from_y: freq(self.from_y),
            to_y: freq(self.to_y),
        }
    }
}

/// Either form of slice bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceConfig {
    Index(IndexSliceConfig),
    Value(ValueSliceConfig),
}

impl SliceConfig {
    fn resolve(&self, grid: &Grid) -> Result<IndexSliceConfig> {
        let resolved = match self {
            SliceConfig::Index(cfg) => *cfg,
            SliceConfig::Value(cfg) => cfg.to_index_config(grid),
        };
        resolved.validate()?;
        Ok(resolved)
    }
}

impl From<IndexSliceConfig> for SliceConfig {
    fn from(cfg: IndexSliceConfig) -> Self {
        SliceConfig::Index(cfg)
    }
}

impl From<ValueSliceConfig> for SliceConfig {
    fn from(cfg: ValueSliceConfig) -> Self {
        SliceConfig::Value(cfg)
    }
}

/// Resolved half-open index ranges on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    n_x: usize,
    n_y: usize,
    pub from_x: usize,
    pub to_x: usize,
    pub from_y: usize,
    pub to_y: usize,
}

impl Slice {
    /// Time columns
    pub fn x_range(&self) -> Range<usize> {
        self.from_x..self.to_x
    }

    /// Frequency rows
    pub fn y_range(&self) -> Range<usize> {
        self.from_y..self.to_y
    }

    /// (rows, cols) as used to index a spectrogram
    pub fn ranges(&self) -> (Range<usize>, Range<usize>) {
        (self.y_range(), self.x_range())
    }

    pub fn width(&self) -> usize {
        self.to_x - self.from_x
    }

    pub fn height(&self) -> usize {
        self.to_y - self.from_y
    }

    /// Shape of a mask over this slice (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    /// Select the slice's part of a full-length time axis array
    pub fn select_x<'a, T>(&self, x: &'a [T]) -> Result<&'a [T]> {
        if x.len() != self.n_x {
            return Err(SyncError::shape(format!(
                "x must have length {}, got {}",
                self.n_x,
                x.len()
            )));
        }
        Ok(&x[self.x_range()])
    }

    /// Select the slice's part of a full-length frequency axis array
    pub fn select_y<'a, T>(&self, y: &'a [T]) -> Result<&'a [T]> {
        if y.len() != self.n_y {
            return Err(SyncError::shape(format!(
                "y must have length {}, got {}",
                self.n_y,
                y.len()
            )));
        }
        Ok(&y[self.y_range()])
    }

    /// Copy the slice's rectangle out of a full-grid matrix
    pub fn select_matrix(&self, matrix: &Spectrogram) -> Result<Spectrogram> {
        let need = (self.n_y, self.n_x);
        if matrix.shape() != need {
            return Err(SyncError::shape(format!(
                "matrix must be shape {:?}, got {:?}",
                need,
                matrix.shape()
            )));
        }
        matrix.sub_matrix(self.y_range(), self.x_range())
    }
}

/// Builds slices that honor a fixed global restriction
#[derive(Debug, Clone)]
pub struct SliceFactory {
    grid: Grid,
    global: IndexSliceConfig,
}

impl SliceFactory {
    /// Resolves the global config once; invalid bounds are rejected here.
    pub fn new(grid: Grid, global: Option<SliceConfig>) -> Result<Self> {
        let global = match global {
            Some(cfg) => cfg.resolve(&grid)?,
            None => IndexSliceConfig::default(),
        };
        Ok(Self { grid, global })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Intersect the global restriction with an optional local one
    pub fn build(&self, local: Option<SliceConfig>) -> Result<Slice> {
        let local = match local {
            Some(cfg) => cfg.resolve(&self.grid)?,
            None => IndexSliceConfig::default(),
        };
        let n_x = self.grid.n_time();
        let n_y = self.grid.n_freq();

        let from_x = self.global.from_x.unwrap_or(0).max(local.from_x.unwrap_or(0));
        let to_x = self.global.to_x.unwrap_or(n_x).min(local.to_x.unwrap_or(n_x)).min(n_x);
        let from_y = self.global.from_y.unwrap_or(0).max(local.from_y.unwrap_or(0));
        let to_y = self.global.to_y.unwrap_or(n_y).min(local.to_y.unwrap_or(n_y)).min(n_y);

        check_bounds("x", Some(from_x), Some(to_x))?;
        check_bounds("y", Some(from_y), Some(to_y))?;

        Ok(Slice {
            n_x,
            n_y,
            from_x,
            to_x,
            from_y,
            to_y,
        })
    }
}

//! Dense energy field and boolean corridor containers

use crate::error::{Result, SyncError};
use std::ops::Range;

/// Spectrogram representation
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// Energy values [frequency_bin][time_frame]
    magnitudes: Vec<Vec<f32>>,
    /// Number of frequency bins
    num_bins: usize,
    /// Number of time frames
    num_frames: usize,
}

impl Spectrogram {
    /// Build from frequency rows. Every row must have the same length.
    pub fn from_rows(magnitudes: Vec<Vec<f32>>) -> Result<Self> {
        let num_bins = magnitudes.len();
        let num_frames = magnitudes.first().map_or(0, Vec::len);
        if let Some((bin, row)) = magnitudes
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != num_frames)
        {
            return Err(SyncError::shape(format!(
                "spectrogram row {} has {} frames, expected {}",
                bin,
                row.len(),
                num_frames
            )));
        }
        Ok(Self {
            magnitudes,
            num_bins,
            num_frames,
        })
    }

    /// All-zero field
    pub fn zeros(num_bins: usize, num_frames: usize) -> Self {
        Self {
            magnitudes: vec![vec![0.0; num_frames]; num_bins],
            num_bins,
            num_frames,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.num_bins, self.num_frames)
    }

    pub fn get(&self, bin: usize, frame: usize) -> f32 {
        self.magnitudes[bin][frame]
    }

    pub fn set(&mut self, bin: usize, frame: usize, value: f32) {
        self.magnitudes[bin][frame] = value;
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.magnitudes
    }

    /// Copy of the rectangle `rows x cols`
    pub fn sub_matrix(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Spectrogram> {
        if rows.end > self.num_bins || cols.end > self.num_frames {
            return Err(SyncError::shape(format!(
                "sub-matrix {:?} x {:?} exceeds spectrogram shape {:?}",
                rows,
                cols,
                self.shape()
            )));
        }
        let num_frames = cols.len();
        let magnitudes: Vec<Vec<f32>> = self.magnitudes[rows]
            .iter()
            .map(|row| row[cols.clone()].to_vec())
            .collect();
        Ok(Spectrogram {
            num_bins: magnitudes.len(),
            num_frames,
            magnitudes,
        })
    }

    /// Total energy of the cells marked in `mask`
    pub fn sum_under(&self, mask: &Mask) -> Result<f64> {
        if mask.shape() != self.shape() {
            return Err(SyncError::shape(format!(
                "mask shape {:?} does not match matrix shape {:?}",
                mask.shape(),
                self.shape()
            )));
        }
        let mut total = 0.0f64;
        for (bin, row) in self.magnitudes.iter().enumerate() {
            for (frame, &value) in row.iter().enumerate() {
                if mask.get(bin, frame) {
                    total += value as f64;
                }
            }
        }
        Ok(total)
    }
}

/// Boolean matrix aligned with a slice; `true` marks the corridor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl Mask {
    pub fn empty(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.cells[row * self.cols + col] = value;
    }

    /// Number of marked cells
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Rows marked in column `col`
    pub fn column(&self, col: usize) -> Vec<usize> {
        (0..self.rows).filter(|&r| self.get(r, col)).collect()
    }

    /// Cellwise OR
    pub fn union(&self, other: &Mask) -> Result<Mask> {
        if self.shape() != other.shape() {
            return Err(SyncError::shape(format!(
                "cannot unite masks of shape {:?} and {:?}",
                self.shape(),
                other.shape()
            )));
        }
        let cells = self
            .cells
            .iter()
            .zip(&other.cells)
            .map(|(&a, &b)| a || b)
            .collect();
        Ok(Mask {
            rows: self.rows,
            cols: self.cols,
            cells,
        })
    }
}

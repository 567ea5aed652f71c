//! Reference-point optimizer
//!
//! Moves one anchor coordinate (or all interior times jointly) to the value
//! that captures the most spectrogram energy under the trajectory's
//! corridor. The search is an exhaustive scan over evenly spaced candidates.

use crate::anchors::Anchors;
use crate::error::{Result, SyncError};
use crate::grid::to_index;
use crate::mask::MaskBuilder;
use crate::piecewise::FormFunction;
use crate::slicer::{IndexSliceConfig, Slice, SliceConfig, SliceFactory};
use crate::spectrogram::{Mask, Spectrogram};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(test)]
mod tests;

/// Diagnostics hook, called once per evaluated candidate
pub type CandidateCallback = Box<dyn Fn(&Slice, &Mask) + Send + Sync>;

/// Outcome of one optimizer call
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    /// Anchors of the winning candidate
    pub anchors: Anchors,
    /// Energy captured by the winning candidate
    pub score: f64,
    /// Number of candidates evaluated
    pub candidates: usize,
}

/// Which coordinate a search moves
#[derive(Debug, Clone, Copy)]
enum Axis {
    Time(usize),
    Freq(usize),
    AllTimes,
}

/// Optimizer over a fixed spectrogram
pub struct RefPointOptimizer<'a> {
    form: FormFunction,
    masks: MaskBuilder,
    slicer: SliceFactory,
    spectrogram: &'a Spectrogram,
    time_samples: Vec<f64>,
    use_first_harmonic: bool,
    callback: Option<CandidateCallback>,
}

impl<'a> RefPointOptimizer<'a> {
    pub fn new(
        form: FormFunction,
        masks: MaskBuilder,
        slicer: SliceFactory,
        spectrogram: &'a Spectrogram,
    ) -> Result<Self> {
        let grid = *slicer.grid();
        if masks.grid() != &grid {
            return Err(SyncError::config(
                "mask builder and slice factory must share the same grid",
            ));
        }
        let need = (grid.n_freq(), grid.n_time());
        if spectrogram.shape() != need {
            return Err(SyncError::shape(format!(
                "spectrogram must be shape {:?}, got {:?}",
                need,
                spectrogram.shape()
            )));
        }
        Ok(Self {
            form,
            masks,
            slicer,
            spectrogram,
            time_samples: grid.time_samples(),
            use_first_harmonic: true,
            callback: None,
        })
    }

    /// Also reward energy at twice the trajectory's frequency (default on)
    pub fn with_first_harmonic(mut self, enabled: bool) -> Self {
        self.use_first_harmonic = enabled;
        self
    }

    pub fn with_callback(mut self, callback: CandidateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn form(&self) -> &FormFunction {
        &self.form
    }

    pub fn slicer(&self) -> &SliceFactory {
        &self.slicer
    }

    /// Search the time of anchor `idx` within `[lo, hi]`
    pub fn optimize_time(
        &self,
        anchors: &Anchors,
        idx: usize,
        lo: f64,
        hi: f64,
        resolution: f64,
    ) -> Result<Optimized> {
        self.search(anchors, Axis::Time(idx), lo, hi, resolution)
    }

    /// Search the frequency of anchor `idx` within `[lo, hi]`
    pub fn optimize_freq(
        &self,
        anchors: &Anchors,
        idx: usize,
        lo: f64,
        hi: f64,
        resolution: f64,
    ) -> Result<Optimized> {
        self.search(anchors, Axis::Freq(idx), lo, hi, resolution)
    }

    /// Shift all interior times together by an offset in `[lo, hi]`; the
    /// first and terminal anchors stay fixed
    pub fn optimize_all_times(
        &self,
        anchors: &Anchors,
        lo: f64,
        hi: f64,
        resolution: f64,
    ) -> Result<Optimized> {
        self.search(anchors, Axis::AllTimes, lo, hi, resolution)
    }

    fn search(
        &self,
        anchors: &Anchors,
        axis: Axis,
        lo: f64,
        hi: f64,
        resolution: f64,
    ) -> Result<Optimized> {
        if !(lo.is_finite() && hi.is_finite()) || lo >= hi {
            return Err(SyncError::config(format!(
                "search bounds must be finite with lo < hi, got [{}, {}]",
                lo, hi
            )));
        }
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(SyncError::config(format!(
                "resolution must be positive and finite, got {}",
                resolution
            )));
        }
        if let Axis::Time(idx) | Axis::Freq(idx) = axis {
            if !anchors.is_interior(idx) {
                return Err(SyncError::config(format!(
                    "anchor index {} is not interior (valid: {:?})",
                    idx,
                    anchors.interior()
                )));
            }
        }
        // reject terminal mismatch before generating candidates
        self.form.parametrize(anchors)?;

        let grid = self.slicer.grid();
        let (step, local): (f64, Option<SliceConfig>) = match axis {
            Axis::Time(_) => {
                let (from, to) = cell_window(lo, hi, grid.time_max(), grid.n_time());
                let cfg = IndexSliceConfig::new(Some(from), Some(to), None, None)?;
                (grid.time_step(), Some(cfg.into()))
            }
            Axis::Freq(_) => {
                let (from, to) = cell_window(lo, hi, grid.freq_max(), grid.n_freq());
                let cfg = IndexSliceConfig::new(None, None, Some(from), Some(to))?;
                (grid.freq_step(), Some(cfg.into()))
            }
            Axis::AllTimes => (grid.time_step(), None),
        };
        let slice = self.slicer.build(local)?;

        let n = candidate_count(lo, hi, step, resolution);
        let values = linspace(lo, hi, n);
        let candidates: Vec<Anchors> = values
            .iter()
            .map(|&v| match axis {
                Axis::Time(idx) => anchors.with_time(idx, v),
                Axis::Freq(idx) => anchors.with_freq(idx, v),
                Axis::AllTimes => anchors.shifted(v),
            })
            .collect();

        log::debug!(
            "Searching {:?} in [{:.3}, {:.3}]: {} candidates, slice rows {:?} cols {:?}",
            axis,
            lo,
            hi,
            n,
            slice.y_range(),
            slice.x_range()
        );

        let sub = slice.select_matrix(self.spectrogram)?;
        let times = &self.time_samples[slice.x_range()];
        let evaluated = AtomicUsize::new(0);
        let report_every = (n / 10).max(1);

        let scores: Vec<f64> = candidates
            .par_iter()
            .map(|candidate| -> Result<f64> {
                let score = self.score(candidate, times, &slice, &sub)?;
                let done = evaluated.fetch_add(1, Ordering::Relaxed) + 1;
                if done % report_every == 0 {
                    log::debug!("  evaluated {}/{} candidates", done, n);
                }
                Ok(score)
            })
            .collect::<Result<_>>()?;

        // first occurrence wins ties
        let mut best = 0;
        for (i, &score) in scores.iter().enumerate() {
            log::trace!("  candidate {} ({:.4}): score {:.4}", i, values[i], score);
            if score > scores[best] {
                best = i;
            }
        }

        log::debug!(
            "Best candidate {} of {} at {:.4} with score {:.4}",
            best,
            n,
            values[best],
            scores[best]
        );

        let mut candidates = candidates;
        Ok(Optimized {
            anchors: candidates.swap_remove(best),
            score: scores[best],
            candidates: n,
        })
    }

    /// Corridor of one candidate, fundamental and optionally first harmonic
    fn corridor(&self, anchors: &Anchors, times: &[f64], slice: &Slice) -> Result<Mask> {
        let curve = self.form.parametrize(anchors)?.eval_many(times);
        let fundamental = self.masks.build(&curve, slice)?;
        if !self.use_first_harmonic {
            return Ok(fundamental);
        }
        let doubled: Vec<f64> = curve.iter().map(|f| 2.0 * f).collect();
        let harmonic = self.masks.build(&doubled, slice)?;
        fundamental.union(&harmonic)
    }

    fn score(
        &self,
        anchors: &Anchors,
        times: &[f64],
        slice: &Slice,
        sub: &Spectrogram,
    ) -> Result<f64> {
        let mask = self.corridor(anchors, times, slice)?;
        if let Some(callback) = &self.callback {
            callback(slice, &mask);
        }
        sub.sum_under(&mask)
    }
}

/// Index range of `[lo, hi]` on one axis, at least one cell wide even when
/// both ends fall into the same cell
fn cell_window(lo: f64, hi: f64, axis_max: f64, axis_count: usize) -> (usize, usize) {
    let count = axis_count as i64;
    let from = to_index(lo, axis_max, axis_count, true).min(count - 1);
    let to = to_index(hi, axis_max, axis_count, true)
        .max(from + 1)
        .min(count);
    (from as usize, to as usize)
}

/// `round((hi - lo) / step * resolution)`, at least one
fn candidate_count(lo: f64, hi: f64, step: f64, resolution: f64) -> usize {
    let n = ((hi - lo) / step * resolution).round();
    if n >= 1.0 {
        n as usize
    } else {
        1
    }
}

/// `n` evenly spaced values from `lo` to `hi`, both included
fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![lo];
    }
    let step = (hi - lo) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { hi } else { lo + step * i as f64 })
        .collect()
}

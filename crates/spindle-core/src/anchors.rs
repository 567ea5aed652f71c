//! Spindle-frequency control points

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};

/// Ordered (time, frequency) control points of a spindle trajectory.
///
/// The first point sits at time 0 and both boundary points carry frequency 0
/// (spindle silent). A frequency of 0 on an interior point means the spindle
/// is off during that interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnchors")]
pub struct Anchors {
    times: Vec<f64>,
    freqs: Vec<f64>,
}

#[derive(Deserialize)]
struct RawAnchors {
    times: Vec<f64>,
    freqs: Vec<f64>,
}

impl TryFrom<RawAnchors> for Anchors {
    type Error = SyncError;

    fn try_from(raw: RawAnchors) -> Result<Self> {
        Anchors::new(raw.times, raw.freqs)
    }
}

impl Anchors {
    pub fn new(times: Vec<f64>, freqs: Vec<f64>) -> Result<Self> {
        if times.len() != freqs.len() {
            return Err(SyncError::config(format!(
                "anchor times ({}) and freqs ({}) must have the same length",
                times.len(),
                freqs.len()
            )));
        }
        if times.len() < 2 {
            return Err(SyncError::config(format!(
                "at least two anchors are required, got {}",
                times.len()
            )));
        }
        if times[0] != 0.0 {
            return Err(SyncError::config(format!(
                "first anchor time must be 0, got {}",
                times[0]
            )));
        }
        let last = freqs.len() - 1;
        if freqs[0] != 0.0 || freqs[last] != 0.0 {
            return Err(SyncError::config(format!(
                "first and last anchor frequency must be 0, got {} and {}",
                freqs[0], freqs[last]
            )));
        }
        if let Some(t) = times.iter().find(|t| t.is_nan()) {
            return Err(SyncError::config(format!("anchor time {} is not a number", t)));
        }
        if let Some(f) = freqs.iter().find(|f| !(f.is_finite() && **f >= 0.0)) {
            return Err(SyncError::config(format!(
                "anchor frequencies must be finite and non-negative, got {}",
                f
            )));
        }
        Ok(Self { times, freqs })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    pub fn time(&self, idx: usize) -> f64 {
        self.times[idx]
    }

    pub fn freq(&self, idx: usize) -> f64 {
        self.freqs[idx]
    }

    /// Time of the terminal point
    pub fn terminal(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Indices that may be moved by the optimizer
    pub fn interior(&self) -> std::ops::Range<usize> {
        1..self.len() - 1
    }

    pub fn is_interior(&self, idx: usize) -> bool {
        idx >= 1 && idx + 1 < self.len()
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.times, self.freqs)
    }

    /// Copy with one interior time replaced
    pub(crate) fn with_time(&self, idx: usize, time: f64) -> Self {
        let mut next = self.clone();
        next.times[idx] = time;
        next
    }

    /// Copy with one interior frequency replaced
    pub(crate) fn with_freq(&self, idx: usize, freq: f64) -> Self {
        let mut next = self.clone();
        next.freqs[idx] = freq;
        next
    }

    /// Copy with every interior time moved by `offset`
    pub(crate) fn shifted(&self, offset: f64) -> Self {
        let mut next = self.clone();
        let last = next.times.len() - 1;
        for t in &mut next.times[1..last] {
            *t += offset;
        }
        next
    }
}

//! Piecewise spindle-frequency trajectory
//!
//! A trajectory is an ordered list of half-open [`Segment`]s. The segments
//! between consecutive anchors are produced by a [`SegmentShaper`]; before the
//! first anchor and from the terminal anchor on the trajectory is 0.

use crate::anchors::Anchors;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};

/// Function shape inside a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentShape {
    /// `freq0 + slope * (t - t0)`
    Ramp { freq0: f64, slope: f64, t0: f64 },
    Constant(f64),
}

/// A function valid on `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub shape: SegmentShape,
}

impl Segment {
    pub fn constant(start: f64, end: f64, value: f64) -> Self {
        Self {
            start,
            end,
            shape: SegmentShape::Constant(value),
        }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }

    pub fn eval(&self, t: f64) -> f64 {
        match self.shape {
            SegmentShape::Ramp { freq0, slope, t0 } => freq0 + slope * (t - t0),
            SegmentShape::Constant(value) => value,
        }
    }
}

/// Ramp slope magnitudes in Hz/s for spin-up and spin-down
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampSlopes {
    ramp_up: f64,
    ramp_down: f64,
}

impl RampSlopes {
    pub fn new(ramp_up: f64, ramp_down: f64) -> Result<Self> {
        for (name, value) in [("ramp_up", ramp_up), ("ramp_down", ramp_down)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SyncError::config(format!(
                    "{} slope must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(Self { ramp_up, ramp_down })
    }

    pub fn symmetric(slope: f64) -> Result<Self> {
        Self::new(slope, slope)
    }

    pub fn ramp_up(&self) -> f64 {
        self.ramp_up
    }

    pub fn ramp_down(&self) -> f64 {
        self.ramp_down
    }

    /// Signed slope towards `freq1`, 0 when no change is needed
    fn signed(&self, freq0: f64, freq1: f64) -> f64 {
        if freq1 > freq0 {
            self.ramp_up
        } else if freq1 < freq0 {
            -self.ramp_down
        } else {
            0.0
        }
    }
}

/// Strategy turning one anchor pair into segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentShaper {
    /// Straight ramp from `freq0` at `t0` to `freq1` at `t1`
    Linear,
    /// `freq1` held across the whole interval
    Plateau,
    /// Bounded ramp towards `freq1`, then hold `freq1`
    Bended(RampSlopes),
}

impl SegmentShaper {
    pub fn build(&self, freq0: f64, freq1: f64, t0: f64, t1: f64) -> Vec<Segment> {
        match self {
            SegmentShaper::Linear => linear(freq0, freq1, t0, t1),
            SegmentShaper::Plateau => plateau(freq1, t0, t1),
            SegmentShaper::Bended(slopes) => bended(slopes, freq0, freq1, t0, t1),
        }
    }
}

fn linear(freq0: f64, freq1: f64, t0: f64, t1: f64) -> Vec<Segment> {
    let duration = t1 - t0;
    if !(duration > 0.0) {
        return Vec::new();
    }
    let slope = (freq1 - freq0) / duration;
    vec![Segment {
        start: t0,
        end: t1,
        shape: SegmentShape::Ramp { freq0, slope, t0 },
    }]
}

fn plateau(freq1: f64, t0: f64, t1: f64) -> Vec<Segment> {
    if !(t1 - t0 > 0.0) {
        return Vec::new();
    }
    vec![Segment::constant(t0, t1, freq1)]
}

fn bended(slopes: &RampSlopes, freq0: f64, freq1: f64, t0: f64, t1: f64) -> Vec<Segment> {
    if !(t1 - t0 > 0.0) {
        return Vec::new();
    }
    let slope = slopes.signed(freq0, freq1);
    if slope == 0.0 {
        return plateau(freq1, t0, t1);
    }

    // The ramp is cut at t1 when the target is not reached in time
    let t_mid = t0 + (freq1 - freq0) / slope;
    let ramp_end = t_mid.min(t1);
    let mut segments = vec![Segment {
        start: t0,
        end: ramp_end,
        shape: SegmentShape::Ramp { freq0, slope, t0 },
    }];
    segments.extend(plateau(freq1, t_mid, t1));
    segments
}

/// Evaluable trajectory produced by [`FormFunction::parametrize`]
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    segments: Vec<Segment>,
}

impl Trajectory {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Frequency at `t`; 0 where no segment applies
    pub fn eval(&self, t: f64) -> f64 {
        self.segments
            .iter()
            .find(|s| s.contains(t))
            .map_or(0.0, |s| s.eval(t))
    }

    pub fn eval_many(&self, times: &[f64]) -> Vec<f64> {
        times.iter().map(|&t| self.eval(t)).collect()
    }
}

/// Builds trajectories from anchors with a fixed shaper and terminal time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormFunction {
    shaper: SegmentShaper,
    terminal: f64,
}

impl FormFunction {
    /// `terminal` is the time every anchor sequence must end at; it may be
    /// `f64::INFINITY`.
    pub fn new(shaper: SegmentShaper, terminal: f64) -> Result<Self> {
        if terminal.is_nan() || terminal <= 0.0 {
            return Err(SyncError::config(format!(
                "terminal time must be positive, got {}",
                terminal
            )));
        }
        Ok(Self { shaper, terminal })
    }

    pub fn shaper(&self) -> SegmentShaper {
        self.shaper
    }

    pub fn terminal(&self) -> f64 {
        self.terminal
    }

    pub fn parametrize(&self, anchors: &Anchors) -> Result<Trajectory> {
        if anchors.terminal() != self.terminal {
            return Err(SyncError::config(format!(
                "last anchor time must equal the terminal time {}, got {}",
                self.terminal,
                anchors.terminal()
            )));
        }
        let times = anchors.times();
        let freqs = anchors.freqs();
        let n = times.len();

        // Duplicate both boundary anchors so every real anchor is handled the
        // same way; the duplicated pairs have zero duration.
        let pad = |v: &[f64]| -> Vec<f64> {
            let mut padded = Vec::with_capacity(v.len() + 2);
            padded.push(v[0]);
            padded.extend_from_slice(v);
            padded.push(v[v.len() - 1]);
            padded
        };
        let times = pad(times);
        let freqs = pad(freqs);

        let mut segments = Vec::with_capacity(2 * n + 2);
        segments.push(Segment::constant(f64::NEG_INFINITY, times[0], 0.0));
        for i in 0..times.len() - 1 {
            segments.extend(self.shaper.build(freqs[i], freqs[i + 1], times[i], times[i + 1]));
        }
        segments.push(Segment::constant(self.terminal, f64::INFINITY, 0.0));

        Ok(Trajectory { segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bended(slope: f64) -> SegmentShaper {
        SegmentShaper::Bended(RampSlopes::symmetric(slope).unwrap())
    }

    #[test]
    fn test_degenerate_duration_emits_nothing() {
        for shaper in [SegmentShaper::Linear, SegmentShaper::Plateau, bended(10.0)] {
            assert!(shaper.build(0.0, 100.0, 3.0, 3.0).is_empty());
        }
    }

    #[test]
    fn test_linear_ramp() {
        let segs = SegmentShaper::Linear.build(100.0, 200.0, 1.0, 3.0);
        assert_eq!(segs.len(), 1);
        assert_abs_diff_eq!(segs[0].eval(1.0), 100.0);
        assert_abs_diff_eq!(segs[0].eval(2.0), 150.0);
        assert!(!segs[0].contains(3.0));
    }

    #[test]
    fn test_bended_equal_freqs_is_plateau() {
        let via_bend = bended(50.0).build(120.0, 120.0, 2.0, 7.0);
        let direct = SegmentShaper::Plateau.build(120.0, 120.0, 2.0, 7.0);
        assert_eq!(via_bend, direct);
        assert_eq!(via_bend, vec![Segment::constant(2.0, 7.0, 120.0)]);
    }

    #[test]
    fn test_bended_ramp_then_hold() {
        let segs = bended(50.0).build(0.0, 100.0, 5.0, 10.0);
        assert_eq!(segs.len(), 2);
        // bend at 5 + 100 / 50
        assert_abs_diff_eq!(segs[0].end, 7.0);
        assert_abs_diff_eq!(segs[1].start, 7.0);
        assert_abs_diff_eq!(segs[0].eval(6.0), 50.0);
        assert_abs_diff_eq!(segs[1].eval(8.0), 100.0);
    }

    #[test]
    fn test_bended_ramp_down_uses_its_own_slope() {
        let shaper = SegmentShaper::Bended(RampSlopes::new(100.0, 25.0).unwrap());
        let segs = shaper.build(100.0, 0.0, 0.0, 10.0);
        assert_abs_diff_eq!(segs[0].end, 4.0);
        assert_abs_diff_eq!(segs[0].eval(2.0), 50.0);
    }

    #[test]
    fn test_bended_cut_when_target_not_reached() {
        let segs = bended(10.0).build(0.0, 100.0, 0.0, 4.0);
        assert_eq!(segs.len(), 1);
        assert_abs_diff_eq!(segs[0].end, 4.0);
        assert_abs_diff_eq!(segs[0].eval(3.0), 30.0);
    }

    #[test]
    fn test_ramp_slopes_must_be_positive() {
        assert!(RampSlopes::new(0.0, 1.0).is_err());
        assert!(RampSlopes::new(1.0, -1.0).is_err());
        assert!(RampSlopes::symmetric(f64::INFINITY).is_err());
    }

    #[test]
    fn test_parametrize_checks_terminal() {
        let form = FormFunction::new(SegmentShaper::Linear, 20.0).unwrap();
        let anchors = Anchors::new(vec![0.0, 5.0, 19.0], vec![0.0, 100.0, 0.0]).unwrap();
        assert!(matches!(form.parametrize(&anchors), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_end_to_end_bended_trajectory() {
        let t_end = 20.0;
        let form = FormFunction::new(bended(50.0), t_end).unwrap();
        let anchors =
            Anchors::new(vec![0.0, 5.0, 10.0, t_end], vec![0.0, 100.0, 100.0, 0.0]).unwrap();
        let traj = form.parametrize(&anchors).unwrap();

        // 0 -> 100 at 50 Hz/s from t=0: bend at t=2
        assert_abs_diff_eq!(traj.eval(1.0), 50.0);
        assert_abs_diff_eq!(traj.eval(2.5), 100.0);
        assert_abs_diff_eq!(traj.eval(7.0), 100.0);
        // 100 -> 0 from t=10 reaches 0 at t=12 and holds
        assert_abs_diff_eq!(traj.eval(11.0), 50.0);
        assert_abs_diff_eq!(traj.eval(t_end - 1e-9), 0.0);
        assert_abs_diff_eq!(traj.eval(t_end + 5.0), 0.0);
        assert_abs_diff_eq!(traj.eval(-1.0), 0.0);
    }

    #[test]
    fn test_segments_partition_the_real_line() {
        let anchors = Anchors::new(
            vec![0.0, 2.0, 2.0, 6.5, 9.0, 15.0],
            vec![0.0, 300.0, 250.0, 0.0, 400.0, 0.0],
        )
        .unwrap();
        for shaper in [SegmentShaper::Linear, SegmentShaper::Plateau, bended(40.0)] {
            let traj = FormFunction::new(shaper, 15.0).unwrap().parametrize(&anchors).unwrap();
            let mut t = -3.0;
            while t < 20.0 {
                let hits = traj.segments().iter().filter(|s| s.contains(t)).count();
                assert_eq!(hits, 1, "t={} covered {} times with {:?}", t, hits, shaper);
                t += 0.01;
            }
        }
    }

    #[test]
    fn test_interior_anchor_returns_its_frequency() {
        let times = vec![0.0, 2.0, 5.0, 6.5, 9.0, 15.0];
        let freqs = vec![0.0, 300.0, 250.0, 0.0, 400.0, 0.0];
        let anchors = Anchors::new(times.clone(), freqs.clone()).unwrap();
        for shaper in [SegmentShaper::Linear, bended(40.0)] {
            let traj = FormFunction::new(shaper, 15.0).unwrap().parametrize(&anchors).unwrap();
            for i in anchors.interior() {
                assert_abs_diff_eq!(traj.eval(times[i]), freqs[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_infinite_terminal() {
        let form = FormFunction::new(bended(100.0), f64::INFINITY).unwrap();
        let anchors = Anchors::new(vec![0.0, 1.0, f64::INFINITY], vec![0.0, 200.0, 0.0]).unwrap();
        let traj = form.parametrize(&anchors).unwrap();
        assert_abs_diff_eq!(traj.eval(0.5), 50.0);
        // ramp down from the anchor's own frequency
        assert_abs_diff_eq!(traj.eval(1.5), 150.0);
        assert_abs_diff_eq!(traj.eval(1e6), 0.0);
    }
}

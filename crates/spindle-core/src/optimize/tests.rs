//! Tests for the reference-point optimizer

use super::*;
use crate::grid::Grid;
use crate::piecewise::{RampSlopes, SegmentShaper};
use approx::assert_abs_diff_eq;
use std::sync::Arc;

const T_END: f64 = 20.0;

// 1 column = 0.1 s, 1 row = 10 Hz
fn grid() -> Grid {
    Grid::new(200, 64, T_END, 640.0).unwrap()
}

/// 200 Hz on [0, 6) s and 400 Hz on [6, 12) s
fn ridge_spectrogram() -> Spectrogram {
    let grid = grid();
    let mut s = Spectrogram::zeros(grid.n_freq(), grid.n_time());
    for (col, &t) in grid.time_samples().iter().enumerate() {
        if t < 6.0 {
            s.set(20, col, 1.0);
        } else if t < 12.0 {
            s.set(40, col, 1.0);
        }
    }
    s
}

/// Only the first harmonic of a 200 Hz run on [0, 6) s
fn harmonic_spectrogram() -> Spectrogram {
    let grid = grid();
    let mut s = Spectrogram::zeros(grid.n_freq(), grid.n_time());
    for (col, &t) in grid.time_samples().iter().enumerate() {
        if t < 6.0 {
            s.set(40, col, 1.0);
        }
    }
    s
}

fn anchors(times: [f64; 4], freqs: [f64; 4]) -> Anchors {
    Anchors::new(times.to_vec(), freqs.to_vec()).unwrap()
}

fn truth() -> Anchors {
    anchors([0.0, 6.0, 12.0, T_END], [0.0, 200.0, 400.0, 0.0])
}

/// Near-instant ramps and a corridor of exactly one cell
fn optimizer(spectrogram: &Spectrogram) -> RefPointOptimizer<'_> {
    let shaper = SegmentShaper::Bended(RampSlopes::symmetric(1e4).unwrap());
    let form = FormFunction::new(shaper, T_END).unwrap();
    let masks = MaskBuilder::new(grid(), 0.0, 0.0).unwrap();
    let slicer = SliceFactory::new(grid(), None).unwrap();
    RefPointOptimizer::new(form, masks, slicer, spectrogram)
        .unwrap()
        .with_first_harmonic(false)
}

#[test]
fn test_linspace_includes_both_ends() {
    let v = linspace(2.0, 4.0, 5);
    assert_eq!(v, vec![2.0, 2.5, 3.0, 3.5, 4.0]);
    assert_eq!(linspace(2.0, 4.0, 1), vec![2.0]);
}

#[test]
fn test_candidate_count() {
    assert_eq!(candidate_count(4.5, 7.0, 0.1, 1.0), 25);
    assert_eq!(candidate_count(380.0, 440.0, 10.0, 2.0), 12);
    // rounds to zero, still one candidate
    assert_eq!(candidate_count(5.9, 5.95, 0.1, 0.1), 1);
}

#[test]
fn test_time_search_finds_speed_change() {
    let spectrogram = ridge_spectrogram();
    let opt = optimizer(&spectrogram);
    let guess = anchors([0.0, 5.0, 12.0, T_END], [0.0, 200.0, 400.0, 0.0]);

    let best = opt.optimize_time(&guess, 1, 4.5, 7.0, 1.0).unwrap();

    assert_eq!(best.candidates, 25);
    assert_abs_diff_eq!(best.anchors.time(1), 6.0, epsilon = 0.1);
    assert_eq!(best.anchors.freqs(), guess.freqs());
    assert_eq!(best.anchors.time(2), 12.0);
}

#[test]
fn test_time_search_finds_spin_down() {
    let spectrogram = ridge_spectrogram();
    let opt = optimizer(&spectrogram);

    let best = opt.optimize_time(&truth(), 2, 11.0, 13.0, 1.0).unwrap();

    assert_eq!(best.candidates, 20);
    assert_abs_diff_eq!(best.anchors.time(2), 12.0, epsilon = 0.1);
    assert_abs_diff_eq!(best.score, 10.0);
}

#[test]
fn test_freq_search_finds_speed() {
    let spectrogram = ridge_spectrogram();
    let opt = optimizer(&spectrogram);
    let guess = anchors([0.0, 6.0, 12.0, T_END], [0.0, 200.0, 420.0, 0.0]);

    let best = opt.optimize_freq(&guess, 2, 380.0, 440.0, 2.0).unwrap();

    assert_eq!(best.candidates, 12);
    assert_abs_diff_eq!(best.anchors.freq(2), 400.0, epsilon = 5.0);
    assert_eq!(best.anchors.times(), guess.times());
    // the local slice only covers rows 38..44, so the 200 Hz run is not scored
    assert_abs_diff_eq!(best.score, 59.0);
}

#[test]
fn test_joint_shift_aligns_schedule() {
    let spectrogram = ridge_spectrogram();
    let opt = optimizer(&spectrogram);
    let early = anchors([0.0, 5.4, 11.4, T_END], [0.0, 200.0, 400.0, 0.0]);

    let best = opt.optimize_all_times(&early, 0.0, 1.2, 1.0).unwrap();

    assert_eq!(best.candidates, 12);
    assert_abs_diff_eq!(best.anchors.time(1), 6.0, epsilon = 0.1);
    assert_abs_diff_eq!(best.anchors.time(2), 12.0, epsilon = 0.1);
    // boundary anchors stay put
    assert_eq!(best.anchors.time(0), 0.0);
    assert_eq!(best.anchors.terminal(), T_END);
}

#[test]
fn test_first_harmonic_is_scored() {
    let spectrogram = harmonic_spectrogram();
    let guess = anchors([0.0, 6.0, 12.0, T_END], [0.0, 200.0, 300.0, 0.0]);

    let with = optimizer(&spectrogram)
        .with_first_harmonic(true)
        .optimize_time(&guess, 1, 4.5, 7.0, 1.0)
        .unwrap();
    assert_abs_diff_eq!(with.anchors.time(1), 6.0, epsilon = 0.1);
    assert!(with.score > 0.0);

    // nothing to find: every candidate scores 0 and the first one wins
    let without = optimizer(&spectrogram)
        .optimize_time(&guess, 1, 4.5, 7.0, 1.0)
        .unwrap();
    assert_eq!(without.score, 0.0);
    assert_eq!(without.anchors.time(1), 4.5);
}

#[test]
fn test_single_candidate_is_lower_bound() {
    let spectrogram = ridge_spectrogram();
    let opt = optimizer(&spectrogram);

    let best = opt.optimize_time(&truth(), 1, 5.9, 5.95, 0.1).unwrap();

    assert_eq!(best.candidates, 1);
    assert_eq!(best.anchors.time(1), 5.9);
}

#[test]
fn test_sub_cell_time_window_scores_one_column() {
    let spectrogram = ridge_spectrogram();
    let opt = optimizer(&spectrogram);

    // both ends fall into column 59
    let best = opt.optimize_time(&truth(), 1, 5.91, 5.95, 1.0).unwrap();

    assert_eq!(best.candidates, 1);
    assert_eq!(best.anchors.time(1), 5.91);
    assert_abs_diff_eq!(best.score, 1.0);
}

#[test]
fn test_sub_cell_freq_window_scores_one_row() {
    let spectrogram = ridge_spectrogram();
    let opt = optimizer(&spectrogram);

    // both ends fall into row 20
    let best = opt.optimize_freq(&truth(), 1, 201.0, 205.0, 1.0).unwrap();

    assert_eq!(best.candidates, 1);
    assert_eq!(best.anchors.freq(1), 201.0);
    assert_abs_diff_eq!(best.score, 59.0);
}

#[test]
fn test_cell_window_is_never_empty() {
    assert_eq!(cell_window(5.91, 5.95, T_END, 200), (59, 60));
    assert_eq!(cell_window(4.5, 7.0, T_END, 200), (45, 70));
    // at the end of the axis the last cell is kept
    assert_eq!(cell_window(19.99, 25.0, T_END, 200), (199, 200));
    assert_eq!(cell_window(30.0, 40.0, T_END, 200), (199, 200));
}

#[test]
fn test_search_is_deterministic() {
    let spectrogram = ridge_spectrogram();
    let opt = optimizer(&spectrogram);
    let guess = anchors([0.0, 5.0, 12.0, T_END], [0.0, 200.0, 400.0, 0.0]);

    let a = opt.optimize_time(&guess, 1, 4.5, 7.0, 1.0).unwrap();
    let b = opt.optimize_time(&guess, 1, 4.5, 7.0, 1.0).unwrap();
    assert_eq!(a, b);
    // the caller's anchors are never modified
    assert_eq!(guess.time(1), 5.0);
}

#[test]
fn test_callback_sees_every_candidate() {
    let spectrogram = ridge_spectrogram();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let opt = optimizer(&spectrogram).with_callback(Box::new(move |slice: &Slice, mask: &Mask| {
        assert_eq!(slice.shape(), mask.shape());
        seen.fetch_add(1, Ordering::Relaxed);
    }));

    let best = opt.optimize_freq(&truth(), 1, 170.0, 230.0, 1.0).unwrap();

    assert_eq!(calls.load(Ordering::Relaxed), best.candidates);
}

#[test]
fn test_invalid_requests_rejected() {
    let spectrogram = ridge_spectrogram();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let opt = optimizer(&spectrogram).with_callback(Box::new(move |_: &Slice, _: &Mask| {
        seen.fetch_add(1, Ordering::Relaxed);
    }));
    let a = truth();

    let cases = [
        opt.optimize_time(&a, 1, 7.0, 7.0, 1.0),
        opt.optimize_time(&a, 1, 7.0, 5.0, 1.0),
        opt.optimize_time(&a, 1, 5.0, f64::INFINITY, 1.0),
        opt.optimize_time(&a, 1, 5.0, 7.0, 0.0),
        opt.optimize_time(&a, 0, 0.0, 1.0, 1.0),
        opt.optimize_freq(&a, 3, 0.0, 10.0, 1.0),
    ];
    for case in cases {
        assert!(matches!(case, Err(SyncError::Config(_))));
    }
    // rejected before any candidate was scored
    assert_eq!(calls.load(Ordering::Relaxed), 0);
}

#[test]
fn test_foreign_terminal_rejected() {
    let spectrogram = ridge_spectrogram();
    let opt = optimizer(&spectrogram);
    let other = anchors([0.0, 6.0, 12.0, 19.0], [0.0, 200.0, 400.0, 0.0]);
    assert!(matches!(
        opt.optimize_time(&other, 1, 5.0, 7.0, 1.0),
        Err(SyncError::Config(_))
    ));
}

#[test]
fn test_mismatched_inputs_rejected() {
    let form = FormFunction::new(SegmentShaper::Linear, T_END).unwrap();
    let slicer = SliceFactory::new(grid(), None).unwrap();

    let small = Spectrogram::zeros(10, 10);
    let masks = MaskBuilder::new(grid(), 0.0, 0.0).unwrap();
    let err = RefPointOptimizer::new(form, masks, slicer.clone(), &small).err();
    assert!(matches!(err, Some(SyncError::Shape(_))));

    let spectrogram = ridge_spectrogram();
    let other_grid = Grid::new(200, 64, 10.0, 640.0).unwrap();
    let masks = MaskBuilder::new(other_grid, 0.0, 0.0).unwrap();
    let err = RefPointOptimizer::new(form, masks, slicer, &spectrogram).err();
    assert!(matches!(err, Some(SyncError::Config(_))));
}

//! Three-pass anchor refinement
//!
//! 1. Joint time pass: all interior anchors are shifted together.
//! 2. Frequency pass: each running interior anchor gets its own frequency
//!    search around the nominal value.
//! 3. Time pass: each interior anchor is searched between the midpoints to
//!    its neighbours.
//!
//! A failing search on one anchor is logged and skipped; the pass goes on
//! with the remaining anchors.

use crate::anchors::Anchors;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::grid::Grid;
use crate::mask::MaskBuilder;
use crate::optimize::{Optimized, RefPointOptimizer};
use crate::piecewise::FormFunction;
use crate::slicer::{SliceFactory, ValueSliceConfig};
use crate::spectrogram::Spectrogram;

/// Result of [`refine_anchors`]
#[derive(Debug, Clone, PartialEq)]
pub struct Refined {
    pub anchors: Anchors,
    /// Candidates evaluated over all passes
    pub candidates: usize,
}

/// Row restriction keeping every anchor frequency and the first harmonic of
/// the highest one inside the searched region.
///
/// Returns an unrestricted config when no anchor has a non-zero frequency.
pub fn frequency_band(anchors: &Anchors, buffer: f64, floor: f64) -> Result<ValueSliceConfig> {
    let running = anchors.freqs().iter().copied().filter(|&f| f != 0.0);
    let Some(lowest) = running.clone().reduce(f64::min) else {
        return Ok(ValueSliceConfig::default());
    };
    let highest = running.fold(f64::MIN, f64::max);

    let from = (lowest - buffer).min(floor);
    let to = (2.0 * highest + buffer).max(floor);
    ValueSliceConfig::new(None, None, Some(from), Some(to))
}

/// Terminal time one second after the last interior anchor, but not before
/// the end of the recording
pub fn terminal_time(last_interior: f64, recording_end: f64) -> f64 {
    (last_interior + 1.0).max(recording_end)
}

/// Optimizer for `anchors` over `spectrogram`, wired from `config`.
///
/// The terminal time is taken from the anchors; the global slice is the
/// [`frequency_band`] of the anchors.
pub fn build_optimizer<'a>(
    config: &SyncConfig,
    grid: Grid,
    spectrogram: &'a Spectrogram,
    anchors: &Anchors,
) -> Result<RefPointOptimizer<'a>> {
    config.validate()?;

    let form = FormFunction::new(config.shaper()?, anchors.terminal())?;
    let (time_window, freq_window) = config.tolerance(&grid);
    let masks = MaskBuilder::with_upsample_factor(
        grid,
        time_window,
        freq_window,
        config.mask.upsample_factor,
    )?;
    let band = frequency_band(anchors, config.band.buffer, config.band.floor)?;
    log::debug!("Frequency band: {:?} .. {:?} Hz", band.from_y, band.to_y);
    let slicer = SliceFactory::new(grid, Some(band.into()))?;

    Ok(RefPointOptimizer::new(form, masks, slicer, spectrogram)?
        .with_first_harmonic(config.mask.use_first_harmonic))
}

/// Run the three refinement passes on `anchors`
pub fn refine_anchors(
    optimizer: &RefPointOptimizer<'_>,
    anchors: Anchors,
    config: &SyncConfig,
) -> Result<Refined> {
    config.validate()?;
    // a wrong terminal would fail every single search
    optimizer.form().parametrize(&anchors)?;

    let mut refined = Refined {
        anchors,
        candidates: 0,
    };

    joint_time_pass(optimizer, &mut refined, config);
    frequency_pass(optimizer, &mut refined, config);
    time_pass(optimizer, &mut refined, config);

    log::info!(
        "Refinement finished after {} candidates",
        refined.candidates
    );
    Ok(refined)
}

fn accept(refined: &mut Refined, step: Result<Optimized>, what: &str) {
    match step {
        Ok(best) => {
            refined.candidates += best.candidates;
            refined.anchors = best.anchors;
        }
        Err(e) => log::warn!("Skipping {}: {}", what, e),
    }
}

fn joint_time_pass(optimizer: &RefPointOptimizer<'_>, refined: &mut Refined, config: &SyncConfig) {
    let anchors = &refined.anchors;
    if anchors.len() < 3 {
        log::info!("Joint time pass skipped: no interior anchors");
        return;
    }
    let n = anchors.len();
    let room = anchors.time(n - 1) - anchors.time(n - 2);
    if !(room.is_finite() && room > 0.0) {
        log::info!("Joint time pass skipped: no room before the terminal ({})", room);
        return;
    }

    log::info!("Joint time pass over [0, {:.3}] s", room);
    let resolution = config.search.global_time_resolution;
    let step = optimizer.optimize_all_times(anchors, 0.0, room, resolution);
    accept(refined, step, "joint time pass");
}

fn frequency_pass(optimizer: &RefPointOptimizer<'_>, refined: &mut Refined, config: &SyncConfig) {
    log::info!("Frequency pass over {} anchors", refined.anchors.interior().len());
    let half_width = config.search.freq_half_width;
    for idx in refined.anchors.interior() {
        let freq = refined.anchors.freq(idx);
        if freq == 0.0 {
            continue;
        }
        let lo = (freq - half_width).max(0.0);
        let step = optimizer.optimize_freq(
            &refined.anchors,
            idx,
            lo,
            freq + half_width,
            config.search.freq_resolution,
        );
        accept(refined, step, &format!("frequency of anchor {}", idx));
    }
}

fn time_pass(optimizer: &RefPointOptimizer<'_>, refined: &mut Refined, config: &SyncConfig) {
    log::info!("Time pass over {} anchors", refined.anchors.interior().len());
    for idx in refined.anchors.interior() {
        let anchors = &refined.anchors;
        let lo = (anchors.time(idx - 1) + anchors.time(idx)) / 2.0;
        let hi = (anchors.time(idx) + anchors.time(idx + 1)) / 2.0;
        let step = optimizer.optimize_time(anchors, idx, lo, hi, config.search.time_resolution);
        accept(refined, step, &format!("time of anchor {}", idx));
    }
}

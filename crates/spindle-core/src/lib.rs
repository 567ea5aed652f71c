//! Spindle Core - Spindle Trajectory Alignment Library
//!
//! Aligns a nominal spindle-speed schedule (anchor times and frequencies) to
//! the ridge a running spindle leaves in a spectrogram. A piecewise form
//! function turns anchors into a frequency curve, a mask builder draws a
//! tolerance corridor around it, and the optimizer moves one anchor
//! coordinate at a time to the candidate whose corridor captures the most
//! energy.

pub mod anchors;
pub mod config;
pub mod error;
pub mod grid;
pub mod mask;
pub mod optimize;
pub mod piecewise;
pub mod pipeline;
pub mod slicer;
pub mod spectrogram;

pub use anchors::Anchors;
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use grid::Grid;
pub use mask::MaskBuilder;
pub use optimize::{Optimized, RefPointOptimizer};
pub use piecewise::{FormFunction, RampSlopes, SegmentShaper, Trajectory};
pub use pipeline::{build_optimizer, frequency_band, refine_anchors, terminal_time, Refined};
pub use slicer::{IndexSliceConfig, Slice, SliceConfig, SliceFactory, ValueSliceConfig};
pub use spectrogram::{Mask, Spectrogram};

/// Refine `anchors` against `spectrogram` with the three-pass protocol
pub fn align(
    grid: Grid,
    spectrogram: &Spectrogram,
    anchors: Anchors,
    config: &SyncConfig,
) -> Result<Refined> {
    let optimizer = build_optimizer(config, grid, spectrogram, &anchors)?;
    refine_anchors(&optimizer, anchors, config)
}

//! spindlesync - Align nominal spindle anchors to a spectrogram
//!
//! Usage:
//!   spindlesync --job job.json                          # default tuning
//!   spindlesync --job job.json --config tuning.toml     # custom tuning
//!   spindlesync --job job.json --output refined.json    # write to file

use anyhow::Result;
use clap::Parser;
use spindle_cli::job::Job;
use spindle_cli::output::{write_json, RefinementOutput};
use spindle_core::SyncConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "spindlesync")]
#[command(about = "Refine spindle speed anchors against a spectrogram", long_about = None)]
struct Args {
    /// Job file (JSON) with grid, spectrogram and nominal anchors
    #[arg(short, long)]
    job: PathBuf,

    /// Tuning file (TOML). Defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the refined anchors here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default: no logs (clean JSON output for parsing)
    let level = match args.verbose {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    run(&args)
}

fn run(args: &Args) -> Result<()> {
    if !args.job.exists() {
        anyhow::bail!("Job file not found: {}", args.job.display());
    }

    let config = match &args.config {
        Some(path) => {
            log::info!("Loading tuning from {}", path.display());
            SyncConfig::load(path)?
        }
        None => SyncConfig::default(),
    };

    let start = std::time::Instant::now();
    let (grid, spectrogram, anchors) = Job::load(&args.job)?.into_parts()?;

    log::info!(
        "Job: {} anchors, grid {} frames x {} bins ({:.1}s, {:.0}Hz)",
        anchors.len(),
        grid.n_time(),
        grid.n_freq(),
        grid.time_max(),
        grid.freq_max()
    );

    let refined = spindle_core::align(grid, &spectrogram, anchors, &config)?;
    let elapsed = start.elapsed();

    log::info!(
        "Refined anchors in {:.2}s ({} candidates)",
        elapsed.as_secs_f64(),
        refined.candidates
    );

    write_json(&RefinementOutput::new(refined, elapsed), args.output.as_deref())
}

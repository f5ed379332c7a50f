//! Binary entrypoint for the quilt display viewer.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use quilt_display::tiling::{PRESETS, Tiling, select_tiling};
use quilt_display::viewer::{ViewerOptions, run};

/// Multi-view lenticular display viewer
#[derive(Debug, Parser)]
#[command(name = "quilt-display", about = "Multi-view lenticular display viewer")]
struct Cli {
    /// Path to the JSON calibration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "LKG_calibration/visual.json"
    )]
    calibration: PathBuf,

    /// Tiling preset index; out-of-range selects the custom tiling below
    #[arg(long, default_value_t = 0)]
    preset: usize,

    /// Custom tile columns (used when --preset is out of range)
    #[arg(long, default_value_t = 4)]
    tiles_x: u32,

    /// Custom tile rows (used when --preset is out of range)
    #[arg(long, default_value_t = 8)]
    tiles_y: u32,

    /// Custom quilt texture size (used when --preset is out of range)
    #[arg(long, default_value_t = 2048)]
    quilt_size: u32,

    /// Directory screenshots are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    screenshot_dir: PathBuf,

    /// Screenshot base name
    #[arg(long, default_value = "screenshot")]
    screenshot_name: String,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("quilt_display={}", level).parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let custom = Tiling::new(cli.tiles_x, cli.tiles_y, cli.quilt_size);
    let tiling = select_tiling(cli.preset, custom);
    let preset_name = PRESETS
        .get(cli.preset)
        .map(|p| p.name)
        .unwrap_or("custom");
    info!(
        preset = preset_name,
        tiles_x = tiling.tiles_x,
        tiles_y = tiling.tiles_y,
        quilt_size = tiling.quilt_size,
        "starting viewer"
    );

    run(ViewerOptions {
        calibration_path: cli.calibration,
        tiling,
        screenshot_dir: cli.screenshot_dir,
        screenshot_name: cli.screenshot_name,
    })
}

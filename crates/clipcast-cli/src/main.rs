//! clipcast — record a screen region to an H.264 MP4 or a looping GIF.
//!
//! ```text
//! clipcast video      --x 100 --y 80 --width 800 --height 600 --duration 10
//! clipcast gif        --width 640 --height 400    # Ctrl-C stops
//! clipcast screenshot --width 800 --height 600
//! ```

mod save;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clipcast_capture::CaptureSource;
use clipcast_core::{CaptureRegion, CaptureSettings, Rect};
use clipcast_record::{GifRecorder, VideoRecorder};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::save::MediaKind;

#[derive(Parser)]
#[command(name = "clipcast", version, about = "Record a screen region to MP4, GIF, or PNG")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record an H.264 MP4 video.
    Video(RecordArgs),
    /// Record a looping GIF.
    Gif(RecordArgs),
    /// Capture a single PNG screenshot (the cursor is never included).
    Screenshot(ShotArgs),
}

#[derive(Args)]
struct RegionArgs {
    /// Region left edge, in display points.
    #[arg(long, default_value_t = 0.0)]
    x: f64,
    /// Region top edge, in display points.
    #[arg(long, default_value_t = 0.0)]
    y: f64,
    /// Region width, in display points.
    #[arg(long)]
    width: f64,
    /// Region height, in display points.
    #[arg(long)]
    height: f64,
    /// X screen number to capture from.
    #[arg(long, default_value_t = 0)]
    display: u32,
    /// Points-to-pixels scale factor of the target display.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
}

impl RegionArgs {
    fn region(&self) -> Result<CaptureRegion> {
        anyhow::ensure!(self.width > 0.0 && self.height > 0.0, "region must have a positive size");
        anyhow::ensure!(self.scale > 0.0, "scale factor must be positive");
        Ok(CaptureRegion::new(
            Rect::new(self.x, self.y, self.width, self.height),
            self.display,
            self.scale,
        ))
    }
}

#[derive(Args)]
struct RecordArgs {
    #[command(flatten)]
    region: RegionArgs,
    /// Stop automatically after this many seconds (otherwise Ctrl-C stops).
    #[arg(long)]
    duration: Option<f64>,
    /// Directory for the output file.
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// JSON settings file (frame rates, GIF max width).
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Args)]
struct ShotArgs {
    #[command(flatten)]
    region: RegionArgs,
    /// Directory for the output file.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Video(args) => record_video(args).await,
        Command::Gif(args) => record_gif(args).await,
        Command::Screenshot(args) => take_screenshot(args).await,
    }
}

async fn record_video(args: RecordArgs) -> Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    let region = args.region.region()?;
    let output = save::output_path(args.out_dir.as_deref(), MediaKind::Video)?;

    let mut recorder = VideoRecorder::new(screen_source()?);
    recorder.start(&region, &settings, output).await?;
    wait_for_stop(args.duration).await?;
    let path = recorder.stop().await?;

    println!("{}", path.display());
    Ok(())
}

async fn record_gif(args: RecordArgs) -> Result<()> {
    let settings = load_settings(args.settings.as_deref())?;
    let region = args.region.region()?;
    let output = save::output_path(args.out_dir.as_deref(), MediaKind::Gif)?;

    let mut recorder = GifRecorder::new(screen_source()?);
    recorder.start(&region, &settings).await?;
    wait_for_stop(args.duration).await?;
    let path = recorder.stop(output).await?;

    println!("{}", path.display());
    Ok(())
}

async fn take_screenshot(args: ShotArgs) -> Result<()> {
    let region = args.region.region()?;
    let output = save::output_path(args.out_dir.as_deref(), MediaKind::Screenshot)?;

    let path = clipcast_record::screenshot::capture(screen_source()?, region, output).await?;

    println!("{}", path.display());
    Ok(())
}

fn screen_source() -> Result<Box<dyn CaptureSource>> {
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(clipcast_capture::ScreenCapturer::new()))
    }
    #[cfg(not(target_os = "linux"))]
    {
        anyhow::bail!("screen capture is only supported on Linux (X11)")
    }
}

fn load_settings(path: Option<&Path>) -> Result<CaptureSettings> {
    let Some(path) = path else {
        return Ok(CaptureSettings::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing settings {}", path.display()))
}

async fn wait_for_stop(duration: Option<f64>) -> Result<()> {
    match duration {
        Some(secs) => {
            info!("recording for {secs}s...");
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
        None => {
            info!("recording... press Ctrl-C to stop");
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
        }
    }
    Ok(())
}

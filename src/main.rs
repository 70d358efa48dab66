//! Bingo Autoplay
//!
//! Plays bingo games on an iPad through WebDriverAgent: reads the card and
//! the called balls from screenshots, daubs, claims bingos and spends boosts.

mod assets;
mod config;
mod device;
mod error;
mod game;
mod layout;
mod logging;
mod ocr;
mod paths;
mod pool;
mod recognition;
mod runner;
mod vision;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use crate::assets::AssetSet;
use crate::config::{load_config, BotConfig};
use crate::device::wda::endpoint;
use crate::device::{ScreenRecorder, WdaClient};
use crate::game::{Boost, CashBoost, KingBoost};
use crate::layout::VariantLayout;
use crate::logging::{init_logging, SessionLog};
use crate::ocr::{find_tessdata_dir, find_tesseract_executable, TesseractRecognizer};
use crate::pool::WorkerPool;
use crate::runner::{Bot, RunOptions};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Variant {
    King,
    Cash,
}

#[derive(Parser)]
#[command(name = "bingo-autoplay")]
#[command(about = "Plays bingo games on a tablet through WebDriverAgent")]
#[command(version)]
struct Cli {
    /// Device address, e.g. http://192.168.1.20
    url: Option<String>,

    /// Which game to play
    #[arg(short, long, value_enum, default_value = "king")]
    variant: Variant,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many games
    #[arg(short, long)]
    games: Option<u32>,

    /// Reference image directory
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Root directory for per-game output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not record the screen
    #[arg(long)]
    no_video: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let session_log = init_logging().context("Failed to initialize logging")?;

    let config_path = cli.config.as_deref().map(paths::resolve).unwrap_or_else(paths::default_config_path);
    let mut config = load_config(&config_path);
    if let Some(url) = &cli.url {
        config.device.base_url = url.clone();
    }
    if cli.no_video {
        config.record_video = false;
    }

    match cli.variant {
        Variant::King => run::<KingBoost>(&cli, config, VariantLayout::king(), session_log),
        Variant::Cash => run::<CashBoost>(&cli, config, VariantLayout::cash(), session_log),
    }
}

fn run<B: Boost>(cli: &Cli, config: BotConfig, mut layout: VariantLayout, session_log: SessionLog) -> Result<()> {
    config.timing.apply(&mut layout.timing);

    let assets_dir = cli
        .assets
        .as_deref()
        .map(paths::resolve)
        .unwrap_or_else(|| paths::default_assets_dir(layout.name));
    let assets = AssetSet::<B>::load(&assets_dir, &layout)
        .with_context(|| format!("Failed to load assets from {}", assets_dir.display()))?;
    info!("Loaded assets from {}", assets_dir.display());

    let tesseract = find_tesseract_executable(config.ocr.tesseract_path.as_deref())?;
    let tessdata = config.ocr.tessdata_dir.clone().or_else(find_tessdata_dir);
    info!("Using tesseract at {}", tesseract.display());
    let ocr = TesseractRecognizer::new(tesseract, tessdata, Duration::from_millis(config.ocr.timeout_ms))?;

    let pool = WorkerPool::new(config.ocr.worker_threads).context("Failed to build worker pool")?;
    info!("Recognition pool: {} threads", pool.threads());

    let device = &config.device;
    let mut client = WdaClient::new(&device.base_url, device.wda_port, Duration::from_millis(device.request_timeout_ms))?;
    let mjpeg_port = config.record_video.then_some(device.mjpeg_port);
    let session_id = client
        .open_app(layout.bundle_id, mjpeg_port)
        .with_context(|| format!("Failed to open {} on {}", layout.bundle_id, client.url()))?;
    info!("WDA session {} for {}", session_id, layout.bundle_id);

    let recorder = mjpeg_port.map(|port| ScreenRecorder::new(endpoint(&device.base_url, port)));

    let options = RunOptions {
        games: cli.games,
        output: cli.output.as_deref().map(paths::resolve).unwrap_or_else(paths::default_games_dir),
        archive_screenshots: config.archive_screenshots,
        max_board_attempts: config.max_board_attempts.max(1),
        final_recording_delay: Duration::from_millis(config.timing.final_recording_delay_ms),
        poll_interval: Duration::from_millis(config.timing.poll_interval_ms),
    };

    let mut bot = Bot::new(client, Box::new(ocr), pool, layout, assets, options, session_log, recorder);
    bot.run()
}

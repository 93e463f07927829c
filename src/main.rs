//! opencut: record a screen region to an animated GIF

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::{
    eyre::{bail, eyre, WrapErr},
    Result,
};
use opencut::capture::{FrameSource, Pattern, TestPattern};
use opencut::{utils, AnimationEncoder, CaptureLoop, CaptureRegion, ChannelOrder, Config};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: opencut [--config <file>] [--synthetic] <x> <y> <width> <height> <seconds> <output.gif>";

struct Args {
    config: Option<PathBuf>,
    synthetic: bool,
    region: (i32, i32, u32, u32),
    /// 0 records until Ctrl+C
    seconds: u64,
    output: PathBuf,
}

fn parse_args() -> Result<Args> {
    let mut config = None;
    let mut synthetic = false;
    let mut positional = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or_else(|| eyre!("--config needs a path\n{USAGE}"))?;
                config = Some(PathBuf::from(path));
            }
            "--synthetic" => synthetic = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => positional.push(arg),
        }
    }

    let [x, y, width, height, seconds, output] = <[String; 6]>::try_from(positional)
        .map_err(|_| eyre!("expected 6 positional arguments\n{USAGE}"))?;

    Ok(Args {
        config,
        synthetic,
        region: (
            x.parse().wrap_err("x")?,
            y.parse().wrap_err("y")?,
            width.parse().wrap_err("width")?,
            height.parse().wrap_err("height")?,
        ),
        seconds: seconds.parse().wrap_err("seconds")?,
        output: PathBuf::from(output),
    })
}

fn test_pattern() -> Box<dyn FrameSource> {
    Box::new(TestPattern::new(Pattern::MovingBar {
        background: [24, 24, 32],
        bar: [240, 180, 40],
    }))
}

#[cfg(feature = "screen-capture")]
fn frame_source(synthetic: bool) -> Box<dyn FrameSource> {
    if synthetic {
        test_pattern()
    } else {
        Box::new(opencut::capture::ScreenSource::new())
    }
}

#[cfg(not(feature = "screen-capture"))]
fn frame_source(synthetic: bool) -> Box<dyn FrameSource> {
    if !synthetic {
        warn!("Built without screen-capture, recording a test pattern instead");
    }
    test_pattern()
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = parse_args()?;

    let config = Config::load(args.config.as_deref()).wrap_err("loading configuration")?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("opencut starting");
    opencut::CONFIG.store(Arc::new(config.clone()));

    let (x, y, width, height) = args.region;
    let region = CaptureRegion::with_minimum(x, y, width, height, config.capture.min_region_size)?;

    let mut recorder = CaptureLoop::from_boxed(frame_source(args.synthetic), config.capture.clone());
    recorder.configure(region)?;

    // Progress is reported off the capture thread
    let (progress_tx, progress_rx) = flume::bounded::<u64>(64);
    let progress = tokio::spawn(async move {
        let mut last_report = Instant::now();
        while let Ok(count) = progress_rx.recv_async().await {
            if last_report.elapsed() >= Duration::from_secs(1) {
                info!("Captured {} frames", count);
                last_report = Instant::now();
            }
        }
    });

    let started = Instant::now();
    recorder.start(config.capture.fps, move |count| {
        let _ = progress_tx.try_send(count);
    })?;

    if args.seconds == 0 {
        println!("Recording {region}, press Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
    } else {
        println!("Recording {region} for {}s, press Ctrl+C to stop early", args.seconds);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.seconds)) => {}
            res = tokio::signal::ctrl_c() => res?,
        }
    }

    let skipped = recorder.skipped_count();
    let frames = recorder.stop();
    let recorded_for = started.elapsed();
    progress.abort();

    if skipped > 0 {
        warn!("{} grabs failed during the recording", skipped);
    }
    if frames.is_empty() {
        bail!("no frames were captured");
    }

    // Captured frames are always normalized to RGB
    let settings = opencut::EncodingSettings {
        source_channel_order: ChannelOrder::Rgb,
        ..config.encoding_settings()
    };
    let encoder = AnimationEncoder::new(settings);
    if let Some(meta) = encoder.frame_metadata(&frames) {
        println!(
            "Captured {} frames ({}x{}) in {:.1}s, {:.1}s of playback",
            meta.count,
            meta.width,
            meta.height,
            recorded_for.as_secs_f64(),
            meta.estimated_duration_seconds
        );
    }

    let output = args.output.clone();
    let size = tokio::task::spawn_blocking(move || encoder.export(&frames, &output)).await??;
    println!("Saved {} ({})", args.output.display(), utils::human_size(size));

    info!("opencut done");
    Ok(())
}

//! Moodlock CLI
//!
//! Usage:
//!   moodlock --simulate 300                 # Synthetic source, virtual clock
//!   moodlock --simulate 50 --realtime       # Synthetic source, real refresh timer
//!   moodlock --replay detections.jsonl      # Recorded detector output
//!   moodlock --inspect frame.png            # Emptiness heuristic on one image
//!   moodlock --serve                        # HTTP API server
//!   moodlock --simulate 100 --json          # JSON output

use clap::Parser;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use moodlock::core::{
    run_server, EmptinessDetector, FrameLoop, ModelSignalSource, ReplayDetector, SignalSource,
    Stabilizer, SyntheticSource,
};
use moodlock::types::{DetectionMode, EmptinessConfig, Emotion, FrameBuffer, FrameReport, Settings};
use moodlock::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "moodlock",
    version = VERSION,
    about = "Moodlock - Stabilize noisy per-frame facial expression signals",
    long_about = "Moodlock turns a noisy per-frame face/expression signal into a\n\
                  temporally stable emotion label for display.\n\n\
                  Modes:\n  \
                  --simulate N  Synthetic detector, N processed frames\n  \
                  --replay FILE Recorded detections (JSON lines, null = no face)\n  \
                  --inspect IMG Run the emptiness heuristic on an image\n  \
                  --serve       HTTP API server mode\n\n\
                  Stabilizer phases:\n  \
                  WARMING_UP  - Neutral placeholder, confidence ramps up\n  \
                  LABEL_*     - Label held, re-evaluated every K frames\n  \
                  GRACE       - Face lost, last label with decaying confidence\n  \
                  NO_FACE     - Face absent past the debounce threshold"
)]
struct Args {
    /// Run the synthetic source for this many processed frames
    #[arg(long, value_name = "FRAMES")]
    simulate: Option<u64>,

    /// Replay recorded detections from a JSON-lines file
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Frames to process in replay mode (default: one pass over the file)
    #[arg(long)]
    frames: Option<u64>,

    /// Run the emptiness heuristic on an image file
    #[arg(long, value_name = "IMAGE")]
    inspect: Option<PathBuf>,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// JSON settings file (missing file → defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Detection mode preset: lenient | aggressive
    #[arg(short, long)]
    mode: Option<DetectionMode>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Drive the loop from a real refresh timer instead of a virtual clock
    #[arg(long)]
    realtime: bool,

    /// Output as JSON lines
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Debug logging and per-frame descriptions
    #[arg(short, long)]
    verbose: bool,
}

/// Display refresh period driving the real-time loop (~60 Hz)
const REFRESH_PERIOD: Duration = Duration::from_millis(16);

/// Default frame count when no mode is given
const DEFAULT_SIMULATED_FRAMES: u64 = 120;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = match load_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            eprintln!("Config error: {}", e);
            std::process::exit(2);
        }
    };

    if args.serve {
        run_serve(&args, settings).await;
    } else if let Some(ref image) = args.inspect {
        run_inspect(image, &settings, &args);
    } else if let Some(ref path) = args.replay {
        run_replay(path, settings, &args).await;
    } else {
        let frames = args.simulate.unwrap_or(DEFAULT_SIMULATED_FRAMES);
        run_simulate(frames, settings, &args).await;
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

/// File settings, then the mode preset, if given, replaces the policy
fn load_settings(args: &Args) -> Result<Settings, moodlock::error::ConfigError> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(mode) = args.mode {
        settings = Settings {
            frame_interval_ms: settings.frame_interval_ms,
            ..Settings::for_mode(mode)
        };
    }
    settings.validate()?;
    Ok(settings)
}

/// Run the synthetic source through the frame loop
async fn run_simulate(frames: u64, settings: Settings, args: &Args) {
    print_header("Simulation", args);
    let source = SyntheticSource::seeded(settings.synthetic.clone(), args.seed);
    let stabilizer = build_stabilizer(&settings, args.seed.map(|s| s.wrapping_add(1)));
    let interval = Duration::from_millis(settings.frame_interval_ms);
    let mut frame_loop = FrameLoop::new(source, stabilizer, interval);

    let summary = drive(&mut frame_loop, frames, args).await;
    print_summary(&summary, frame_loop.source_errors(), args);
}

/// Replay a recording through the model adapter
async fn run_replay(path: &Path, settings: Settings, args: &Args) {
    let detector = ReplayDetector::new(path);
    let records = match detector.preload().await {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, "replay load failed");
            eprintln!("Could not load recording: {}", e);
            std::process::exit(1);
        }
    };
    info!(records, "recording ready");

    print_header("Replay", args);
    let frames = args.frames.unwrap_or(records as u64);
    let source = ModelSignalSource::new(detector);
    let stabilizer = build_stabilizer(&settings, args.seed);
    let interval = Duration::from_millis(settings.frame_interval_ms);
    let mut frame_loop = FrameLoop::new(source, stabilizer, interval);

    let summary = drive(&mut frame_loop, frames, args).await;
    print_summary(&summary, frame_loop.source_errors(), args);
}

fn build_stabilizer(settings: &Settings, seed: Option<u64>) -> Stabilizer {
    match seed {
        Some(seed) => Stabilizer::seeded(settings.stabilizer.clone(), seed),
        None => Stabilizer::new(settings.stabilizer.clone()),
    }
}

/// Process `frames` frames, printing each one; returns per-emotion counts
async fn drive<S: SignalSource>(
    frame_loop: &mut FrameLoop<S>,
    frames: u64,
    args: &Args,
) -> BTreeMap<Emotion, u64> {
    let mut counts = BTreeMap::new();

    if args.realtime {
        frame_loop
            .run(REFRESH_PERIOD, frames, |report| {
                *counts.entry(report.result.emotion).or_insert(0) += 1;
                print_report(report, args);
            })
            .await;
        return counts;
    }

    frame_loop
        .run_virtual(Instant::now(), frames, |report| {
            *counts.entry(report.result.emotion).or_insert(0) += 1;
            print_report(report, args);
        })
        .await;
    counts
}

/// Run emptiness heuristic on an image
fn run_inspect(path: &Path, settings: &Settings, args: &Args) {
    let frame = match FrameBuffer::open(path) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let config = settings.synthetic.emptiness.clone().unwrap_or_else(EmptinessConfig::refined);
    let report = EmptinessDetector::new(config).analyze(&frame);

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        }
        return;
    }

    let verdict = if report.empty { "EMPTY" } else { "OCCUPIED" };
    let verdict = if args.no_color {
        verdict.normal()
    } else if report.empty {
        verdict.red().bold()
    } else {
        verdict.green().bold()
    };
    println!("{} ({}x{})", path.display(), frame.width(), frame.height());
    println!("  samples:          {}", report.samples);
    println!("  mean luma:        {:.1}", report.mean_luma);
    println!("  contrast share:   {:.3}", report.contrast_fraction);
    println!("  verdict:          {}", verdict);
}

fn print_report(report: &FrameReport, args: &Args) {
    if args.json {
        match serde_json::to_string(report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize frame: {}", e),
        }
    } else if args.no_color {
        println!("{}", report.to_parseable_string());
    } else {
        println!("{}", report.to_terminal_string());
        if args.verbose {
            println!("{}", format!("        {}", report.result.emotion.description()).dimmed());
        }
    }
}

/// Print header
fn print_header(mode: &str, args: &Args) {
    if args.json {
        return;
    }
    let title = format!("Moodlock v{} - {}", VERSION, mode);
    if args.no_color {
        println!("========================================");
        println!("  {}", title);
        println!("========================================");
    } else {
        println!("{}", "════════════════════════════════════════".bold());
        println!("  {}", title.bold());
        println!("{}", "════════════════════════════════════════".bold());
    }
    println!();
}

fn print_summary(counts: &BTreeMap<Emotion, u64>, source_errors: u64, args: &Args) {
    if args.json {
        return;
    }
    let total: u64 = counts.values().sum();
    println!();
    println!("Frames: {} | Source errors: {}", total, source_errors);
    for (emotion, n) in counts {
        let share = if total > 0 { *n as f64 / total as f64 } else { 0.0 };
        let line = format!("  {:<10} {:>5}  ({:>5.1}%)", emotion.label(), n, share * 100.0);
        if args.no_color {
            println!("{}", line);
        } else {
            println!("{}{}{}", emotion.color_code(), line, Emotion::color_reset());
        }
    }
}

/// Run HTTP API server
async fn run_serve(args: &Args, settings: Settings) {
    if !args.no_color {
        println!("{}", format!("Moodlock API Server v{}", VERSION).bold());
    }
    if let Err(e) = run_server(&args.addr, settings).await {
        error!(error = %e, "server stopped");
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

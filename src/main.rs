use jam_responder::config::JamConfig;
use jam_responder::console_display;
use jam_responder::event_reader::{self, PerformanceReader};
use jam_responder::osc_sender;
use jam_responder::session::Session;
use jam_responder::simulator;
use jam_responder::trigger::TriggerController;
use jam_responder::types::*;

use clap::Parser;
use crossbeam_channel::{bounded, Sender};
use log::{error, info};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

#[derive(Parser)]
#[command(name = "jam-responder")]
#[command(about = "Call-and-response MIDI jam partner")]
struct Cli {
    /// Generation mode: harmony, continue, improvise or groove
    #[arg(long)]
    mode: Option<Mode>,

    /// Randomness of the reply (0 = literal, 1 = normal, >1 = adventurous)
    #[arg(long)]
    temperature: Option<f64>,

    /// Seconds of silence after the last note before the reply starts
    #[arg(long)]
    silence_threshold: Option<f64>,

    /// Fixed RNG seed for reproducible replies
    #[arg(long)]
    seed: Option<u64>,

    /// JSON config file (flags override its values)
    #[arg(long, default_value = "jam-config.json")]
    config: PathBuf,

    /// Simulator demo sequence: "basic" (default), "tour" (all four modes) or "chords"
    #[arg(long, default_value = "basic")]
    demo: String,

    /// Replay a recorded JSONL performance instead of the simulator
    #[arg(long)]
    replay: Option<PathBuf>,

    /// OSC target address
    #[arg(long, default_value = "127.0.0.1:9000")]
    osc_target: String,

    /// Enable OSC output
    #[arg(long)]
    osc: bool,

    /// Disable the console score display
    #[arg(long)]
    no_console: bool,
}

fn spawn<F>(handles: &mut Vec<JoinHandle<()>>, name: &str, f: F)
where
    F: FnOnce() + Send + 'static,
{
    match thread::Builder::new().name(name.into()).spawn(f) {
        Ok(h) => handles.push(h),
        Err(e) => error!("Failed to spawn {} thread: {}", name, e),
    }
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();

    let file_config = JamConfig::load(&cli.config).unwrap_or_default();
    let config = JamConfig {
        mode: cli.mode.unwrap_or(file_config.mode),
        temperature: cli.temperature.unwrap_or(file_config.temperature),
        silence_threshold_secs: cli
            .silence_threshold
            .unwrap_or(file_config.silence_threshold_secs),
        seed: cli.seed.or(file_config.seed),
    }
    .sanitized();

    let clock = SessionClock::new();

    info!("═══════════════════════════════════════════════");
    info!("  JAM RESPONDER v{}", env!("CARGO_PKG_VERSION"));
    info!("  Mode: {}   Temperature: {:.2}", config.mode, config.temperature);
    info!("  Silence threshold: {:.2}s", config.silence_threshold_secs);
    match &cli.replay {
        Some(path) => info!("  Input: replay {:?}", path),
        None => info!("  Input: simulator ({})", cli.demo),
    }
    if let Some(seed) = config.seed { info!("  Seed: {}", seed); }
    if cli.osc { info!("  Output: OSC → {}", cli.osc_target); }
    info!("═══════════════════════════════════════════════");

    // Channel: input source → session
    let (input_tx, input_rx) = bounded::<InputEvent>(1024);

    // Channels: session → consumers
    let mut response_txs: Vec<Sender<Response>> = Vec::new();

    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if !cli.no_console {
        let (tx, rx) = bounded::<Response>(64);
        response_txs.push(tx);
        spawn(&mut handles, "display", move || {
            console_display::ConsoleDisplay::new(rx).run();
        });
    }

    // ─── OSC sender ─────────────────────────────────────────────────
    if cli.osc {
        let (tx, rx) = bounded::<Response>(64);
        response_txs.push(tx);
        let target = cli.osc_target.clone();
        spawn(&mut handles, "osc", move || {
            osc_sender::OscSender::new(rx, target).run();
        });
    }

    // ─── Session ────────────────────────────────────────────────────
    let controller = TriggerController::new(
        config.mode,
        config.temperature,
        config.silence_threshold_secs,
        config.seed,
    );
    let session_clock = clock.clone();
    spawn(&mut handles, "session", move || {
        Session::new(input_rx, response_txs, controller, session_clock).run();
    });

    // ─── Input source ───────────────────────────────────────────────
    match cli.replay {
        Some(path) => {
            let reader = File::open(&path)
                .map_err(|e| format!("open {:?}: {}", path, e))
                .and_then(|f| PerformanceReader::open(BufReader::new(f)));
            match reader {
                Ok(reader) => {
                    if !reader.header.description.is_empty() {
                        info!("Performance: {}", reader.header.description);
                    }
                    let events = reader.read_all();
                    let replay_clock = clock.clone();
                    spawn(&mut handles, "replay", move || {
                        event_reader::replay(&events, &replay_clock, &input_tx);
                    });
                }
                Err(e) => {
                    error!("Cannot replay performance: {}", e);
                    drop(input_tx);
                }
            }
        }
        None => {
            info!("Starting simulator...");
            let sim_clock = clock.clone();
            let demo = cli.demo.clone();
            spawn(&mut handles, "simulator", move || {
                simulator::Simulator::new(sim_clock, input_tx).run(&demo);
            });
        }
    }

    // The session ends when the input source hangs up; consumers follow.
    for h in handles {
        let _ = h.join();
    }
}

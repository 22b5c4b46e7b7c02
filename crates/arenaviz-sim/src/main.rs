//! Arenaviz simulator host binary.
//!
//! Wires the demo arena engine to the visualization server: loads
//! configuration, builds the controller and broadcaster, spawns the two
//! core threads, and serves websocket/HTTP traffic until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Create the broadcaster (so the log layer can attach to it)
//! 2. Initialize structured logging (tracing + broadcast log layer)
//! 3. Load and validate configuration from `arenaviz.yaml`
//! 4. Build the demo arena engine and its encoder registry
//! 5. Create the experiment controller (autoplay if configured)
//! 6. Spawn the step loop and broadcast loop threads
//! 7. Serve until Ctrl-C, then clear the running flag and join

mod demo;
mod encoders;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context as _;
use arenaviz_core::broadcast::{Broadcaster, run_broadcast_loop};
use arenaviz_core::config::VizConfig;
use arenaviz_core::controller::ExperimentController;
use arenaviz_core::step_loop::run_step_loop;
use arenaviz_server::logs::BroadcastLogLayer;
use arenaviz_server::server::start_server;
use arenaviz_server::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::demo::{DemoArena, DemoConfig};

/// Configuration file looked up relative to the working directory.
const CONFIG_FILE: &str = "arenaviz.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. The broadcaster exists before logging so every log line from
    //    here on can reach connected clients.
    let broadcaster = Arc::new(Broadcaster::new());

    // 2. Structured logging: console output plus the broadcast log queue.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(BroadcastLogLayer::new(Arc::clone(&broadcaster)))
        .init();

    info!("arenaviz-sim starting");

    // 3. Configuration.
    let config = load_config().context("loading configuration")?;
    config.validate().context("validating configuration")?;
    info!(
        port = config.port,
        broadcast_frequency = config.broadcast_frequency,
        ff_draw_frames_every = config.ff_draw_frames_every,
        autoplay = config.autoplay,
        tls = config.tls.enabled(),
        "Configuration loaded"
    );

    // 4. Demo engine and encoders.
    let engine = DemoArena::new(DemoConfig::default());
    let registry = encoders::demo_registry();

    // 5. Controller.
    let controller = Arc::new(ExperimentController::new(
        Box::new(engine),
        registry,
        Arc::clone(&broadcaster),
        u64::from(config.ff_draw_frames_every),
    ));
    if config.autoplay {
        controller.play();
    }

    // 6. The two core threads, tied to one shutdown flag.
    let running = Arc::new(AtomicBool::new(true));

    let step_controller = Arc::clone(&controller);
    let step_running = Arc::clone(&running);
    let step_handle = std::thread::Builder::new()
        .name(String::from("step-loop"))
        .spawn(move || run_step_loop(&step_controller, &step_running))
        .context("spawning step loop thread")?;

    let cast_broadcaster = Arc::clone(&broadcaster);
    let cast_running = Arc::clone(&running);
    let period = config.broadcast_period();
    let cast_handle = std::thread::Builder::new()
        .name(String::from("broadcast-loop"))
        .spawn(move || run_broadcast_loop(&cast_broadcaster, period, &cast_running))
        .context("spawning broadcast loop thread")?;

    // 7. Serve until the process is told to stop.
    let state = Arc::new(AppState::new(Arc::clone(&controller), broadcaster));
    let result = tokio::select! {
        served = start_server(&config, state) => served.context("server exited"),
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    };

    running.store(false, Ordering::Release);
    step_handle
        .join()
        .map_err(|_| anyhow::anyhow!("step loop thread panicked"))?;
    cast_handle
        .join()
        .map_err(|_| anyhow::anyhow!("broadcast loop thread panicked"))?;

    info!("arenaviz-sim shutdown complete");
    result
}

/// Load configuration from `arenaviz.yaml`, falling back to defaults
/// when the file does not exist.
fn load_config() -> Result<VizConfig, arenaviz_core::config::ConfigError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        VizConfig::from_file(config_path)
    } else {
        info!("Config file not found, using defaults");
        Ok(VizConfig::default())
    }
}

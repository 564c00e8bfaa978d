//! BACtrack Harness - headless driver for the BACtrack bridge.
//!
//! Runs the bridge over the simulated vendor SDK and speaks JSON lines:
//! requests on stdin, acknowledgments, errors and events on stdout. Logs go
//! to stderr so stdout stays machine-readable.

mod config;
mod wire;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bactrack_core::protocol_constants::ARG_API_KEY;
use bactrack_core::{
    BactrackBridge, CommandRequest, DeliveryRuntime, Event, HostContext, Platform, SimulatedSdk,
};
use clap::Parser;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use crate::config::HarnessConfig;
use crate::wire::{InputLine, LineWriter, OutputLine, StreamControl};

/// BACtrack Harness - drive the breathalyzer bridge over stdin/stdout.
#[derive(Parser, Debug)]
#[command(name = "bactrack-harness")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "BACTRACK_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// SDK flavour to simulate (overrides config file).
    #[arg(short = 'p', long, env = "BACTRACK_PLATFORM")]
    platform: Option<Platform>,

    /// Initialize with this API key at startup.
    #[arg(short = 'k', long, env = "BACTRACK_API_KEY")]
    api_key: Option<String>,

    /// Only fire callbacks in response to metadata requests.
    #[arg(long)]
    no_autoplay: bool,

    /// Mirror every event to the log.
    #[arg(long)]
    log_events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("BACtrack Harness v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        HarnessConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(platform) = args.platform {
        config.platform = platform;
    }
    if let Some(api_key) = args.api_key {
        config.api_key = Some(api_key);
    }
    if args.no_autoplay {
        config.autoplay = false;
    }
    if args.log_events {
        config.bridge.log_events = true;
    }

    log::info!(
        "Configuration: platform={}, autoplay={}, init_outcome={:?}",
        config.platform,
        config.autoplay,
        config.init_outcome
    );

    // Events are delivered on a dedicated thread, never on the stdin loop.
    let mut delivery = DeliveryRuntime::new().context("Failed to start delivery runtime")?;

    let sdk = SimulatedSdk::new(config.platform);
    sdk.set_init_outcome(config.init_outcome.clone());
    sdk.set_profile(config.device.clone());
    sdk.set_autoplay(config.autoplay);

    let bridge = BactrackBridge::new(
        Arc::new(sdk),
        Some(HostContext::new(config.host_label.clone())),
        &delivery,
        config.bridge.clone(),
    );
    let out = LineWriter::stdout();

    if config.listen_on_start {
        listen(&bridge, &out);
    }

    if let Some(api_key) = &config.api_key {
        let mut args = Map::new();
        args.insert(ARG_API_KEY.into(), Value::String(api_key.clone()));
        respond(
            &bridge,
            &out,
            &CommandRequest::with_args("initialize", Value::Object(args)),
        );
    }

    let end_of_input = tokio::select! {
        result = command_loop(&bridge, &out) => {
            result?;
            true
        }
        _ = shutdown_signal() => false,
    };

    if end_of_input {
        log::info!("End of input, draining events for {}ms", config.drain_ms);
        tokio::time::sleep(Duration::from_millis(config.drain_ms)).await;
    } else {
        log::info!("Shutdown signal received, cleaning up...");
    }

    bridge.flush().await;
    bridge.teardown();
    delivery.shutdown();

    log::info!("Shutdown complete");
    Ok(())
}

/// Reads requests until stdin closes.
async fn command_loop(bridge: &BactrackBridge, out: &LineWriter) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<InputLine>(line) {
            Ok(InputLine::Command(request)) => respond(bridge, out, &request),
            Ok(InputLine::Stream {
                stream: StreamControl::Listen,
            }) => listen(bridge, out),
            Ok(InputLine::Stream {
                stream: StreamControl::Cancel,
            }) => {
                bridge.unsubscribe();
                log::info!("[Harness] Event stream cancelled");
            }
            Err(e) => {
                log::warn!("[Harness] Malformed request: {}", e);
                out.write(&OutputLine::malformed(e.to_string()));
            }
        }
    }

    Ok(())
}

fn respond(bridge: &BactrackBridge, out: &LineWriter, request: &CommandRequest) {
    let outcome = bridge.handle(request);
    out.write(&OutputLine::reply(&request.command, &outcome));
}

fn listen(bridge: &BactrackBridge, out: &LineWriter) {
    let out = out.clone();
    bridge.subscribe(move |event: Event| out.write(&OutputLine::event(&event)));
    log::info!("[Harness] Event stream listening");
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

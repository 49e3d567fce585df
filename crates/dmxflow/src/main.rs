//! DmxFlow - DMX512 moving head controller
//!
//! Opens the serial line, starts the frame engine and runs the operator
//! console on stdin. Engine events are logged and mapped to the status
//! indicator.

#![warn(missing_docs)]

mod console;
mod logging_setup;

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, select, unbounded, Receiver};
use dmxflow_control::{
    ChannelSink, CommandSurface, DmxEngine, EngineConfig, EngineEvent, EventSink,
    JsonSceneStore, SequenceDef, TracingSink,
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

use console::{parse_line, ConsoleCommand, HELP};

const DEFAULT_CONFIG: &str = "dmxflow.json";

/// Capacity of the engine event queue; overflow is dropped
const EVENT_QUEUE: usize = 256;

/// The main entry point for the application.
fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    let mut config = EngineConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {:?}", config_path))?;
    config
        .apply_env()
        .context("Invalid DMX environment override")?;

    let _log_guard = logging_setup::init(&config.log)?;

    info!("==========================================");
    info!("===      DmxFlow Session Started       ===");
    info!("==========================================");

    let transport = open_transport(&config);
    let scenes = JsonSceneStore::new(&config.scene_dir)
        .with_context(|| format!("Failed to open scene directory {:?}", config.scene_dir))?;

    let (event_tx, event_rx) = bounded(EVENT_QUEUE);
    let engine = DmxEngine::start(
        &config,
        transport,
        Arc::new(scenes),
        Arc::new(ChannelSink::new(event_tx)),
    )
    .context("Failed to start DMX engine")?;

    println!("{}", HELP);
    run_console(&engine, event_rx);

    info!("--- Shutting down ---");
    drop(engine);
    Ok(())
}

#[cfg(feature = "serial")]
fn open_transport(config: &EngineConfig) -> Box<dyn dmxflow_control::DmxTransport> {
    Box::new(dmxflow_control::SerialTransport::new(
        &config.port,
        config.baud_rate,
        config.write_timeout(),
    ))
}

#[cfg(not(feature = "serial"))]
fn open_transport(config: &EngineConfig) -> Box<dyn dmxflow_control::DmxTransport> {
    warn!("Built without serial support, {} will not be driven", config.port);
    Box::new(dmxflow_control::NullTransport)
}

/// Forward stdin lines to a channel so the console can also watch events
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Console input error: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

fn run_console(engine: &DmxEngine, events: Receiver<EngineEvent>) {
    let lines = match spawn_stdin_reader() {
        Ok(lines) => lines,
        Err(e) => {
            error!("Failed to start console: {}", e);
            return;
        }
    };
    let surface = engine.surface();
    let log_sink = TracingSink;

    loop {
        select! {
            recv(events) -> event => {
                if let Ok(event) = event {
                    if let Some(light) = event.status_light() {
                        let (r, g, b) = light.rgb();
                        info!("Status LED {:?} ({}, {}, {})", light, r, g, b);
                    }
                    log_sink.emit(event);
                }
            }
            recv(lines) -> line => {
                // stdin closed
                let Ok(line) = line else { break };
                match parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(ConsoleCommand::Quit)) => break,
                    Ok(Some(command)) => execute(engine, &surface, command),
                    Err(e) => println!("{}", e),
                }
            }
        }
    }
}

fn execute(engine: &DmxEngine, surface: &CommandSurface, command: ConsoleCommand) {
    let result = match command {
        ConsoleCommand::Control(event) => surface.handle(event),
        ConsoleCommand::SetParameters(effect) => surface.set_effect_parameters(effect),
        ConsoleCommand::PlaySequenceFile(path) => SequenceDef::load_file(&path)
            .and_then(|def| surface.play_sequence_def(&def)),
        ConsoleCommand::DeleteScene(name) => surface.delete_scene(&name),
        ConsoleCommand::ListScenes => surface.list_scenes().map(|names| {
            if names.is_empty() {
                println!("(no scenes)");
            }
            for name in names {
                println!("  {}", name);
            }
        }),
        ConsoleCommand::Patch(config) => surface.configure(config),
        ConsoleCommand::Status => {
            let status = surface.status();
            println!(
                "patch {} | effect {} | sequencer {:?} (step {})",
                status.fixture,
                status
                    .effect
                    .map(|kind| kind.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                status.sequencer,
                status.sequence_step
            );
            Ok(())
        }
        ConsoleCommand::Stats => {
            let stats = engine.stats();
            println!(
                "frames sent {} | failed {} | failing now {}",
                stats.frames_sent, stats.frames_failed, stats.consecutive_failures
            );
            Ok(())
        }
        ConsoleCommand::Help => {
            println!("{}", HELP);
            Ok(())
        }
        ConsoleCommand::Quit => Ok(()),
    };

    if let Err(e) = result {
        println!("error: {}", e);
    }
}

//! Engine runtime
//!
//! [`DmxEngine`] owns two timing threads sharing one [`CommandSurface`]:
//! - `dmx-transmit` sends a frame every refresh interval
//! - `dmx-driver` advances the active effect or sequence every effect interval
//!
//! Each engine has its own buffer and threads. Dropping the engine stops
//! and joins both threads.

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::command::CommandSurface;
use crate::config::EngineConfig;
use crate::dmx::{DmxTransport, TransmitStats, Transmitter};
use crate::events::EventSink;
use crate::scene::SceneStore;
use crate::Result;

/// Running DMX engine
pub struct DmxEngine {
    surface: Arc<CommandSurface>,
    stats: Arc<RwLock<TransmitStats>>,
    stop_tx: Option<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
}

impl DmxEngine {
    /// Validate `config` and start the timing threads
    pub fn start(
        config: &EngineConfig,
        transport: Box<dyn DmxTransport>,
        scenes: Arc<dyn SceneStore>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config.validate()?;

        let surface = Arc::new(
            CommandSurface::new(config.fixture, scenes, sink.clone())?
                .with_audio_timeout(config.audio_timeout()),
        );
        let stats = Arc::new(RwLock::new(TransmitStats::default()));
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let transmitter = Transmitter::new(transport, config.timing(), sink);
        let mut engine = Self {
            surface: surface.clone(),
            stats: stats.clone(),
            stop_tx: Some(stop_tx),
            threads: Vec::with_capacity(2),
        };

        let transmit = spawn_transmit_thread(
            transmitter,
            surface.clone(),
            stats,
            config.refresh_interval(),
            stop_rx.clone(),
        )?;
        engine.threads.push(transmit);

        // On failure `engine` drops here and stops the transmit thread
        let driver = spawn_driver_thread(surface, config.effect_interval(), stop_rx)?;
        engine.threads.push(driver);

        tracing::info!(
            "DMX engine started: {} frame every {:?}, effects every {:?}",
            config.fixture,
            config.refresh_interval(),
            config.effect_interval()
        );
        Ok(engine)
    }

    /// Shared handle for submitting commands
    pub fn surface(&self) -> Arc<CommandSurface> {
        self.surface.clone()
    }

    /// Copy of the transmit counters
    pub fn stats(&self) -> TransmitStats {
        *self.stats.read()
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    /// Stop both threads and wait for them. Idempotent.
    pub fn shutdown(&mut self) {
        // Closing the channel wakes both select loops
        if self.stop_tx.take().is_none() {
            return;
        }
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("dmx").to_string();
            if handle.join().is_err() {
                tracing::error!("{} thread panicked", name);
            }
        }
        tracing::info!("DMX engine stopped");
    }
}

impl Drop for DmxEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_transmit_thread(
    mut transmitter: Transmitter,
    surface: Arc<CommandSurface>,
    stats: Arc<RwLock<TransmitStats>>,
    interval: Duration,
    stop_rx: Receiver<()>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("dmx-transmit".to_string())
        .spawn(move || {
            tracing::debug!("Transmit thread started");
            let ticker = tick(interval);
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        transmitter.tick(&surface);
                        *stats.write() = transmitter.stats();
                    }
                }
            }
            tracing::debug!("Transmit thread stopped");
        })?;
    Ok(handle)
}

fn spawn_driver_thread(
    surface: Arc<CommandSurface>,
    interval: Duration,
    stop_rx: Receiver<()>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("dmx-driver".to_string())
        .spawn(move || {
            tracing::debug!("Driver thread started");
            let ticker = tick(interval);
            let mut last = Instant::now();
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> at => {
                        let now = at.unwrap_or_else(|_| Instant::now());
                        surface.tick(now.saturating_duration_since(last));
                        last = now;
                    }
                }
            }
            tracing::debug!("Driver thread stopped");
        })?;
    Ok(handle)
}

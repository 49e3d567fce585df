//! Frame transmitter
//!
//! One [`Transmitter::tick`] per refresh period: snapshot the universe,
//! frame it, hand it to the transport. A failing transport is logged once
//! per failure run and retried on the next tick.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::frame::{DmxFrame, FrameTiming};
use super::transport::DmxTransport;
use crate::command::CommandSurface;
use crate::events::{EngineEvent, EventSink};

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmitStats {
    pub frames_sent: u64,
    pub frames_failed: u64,
    /// Failed frames in the current failure run (0 while healthy)
    pub consecutive_failures: u64,
}

/// Drives a transport from the command surface's buffer
pub struct Transmitter {
    transport: Box<dyn DmxTransport>,
    timing: FrameTiming,
    sink: Arc<dyn EventSink>,
    stats: TransmitStats,
}

impl Transmitter {
    pub fn new(
        transport: Box<dyn DmxTransport>,
        timing: FrameTiming,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        tracing::info!(
            "DMX transmitter on {} (break {:?}, MAB {:?}, {} baud)",
            transport.name(),
            timing.break_time,
            timing.mark_after_break,
            timing.baud_rate
        );
        Self {
            transport,
            timing,
            sink,
            stats: TransmitStats::default(),
        }
    }

    /// Send one frame built from a consistent snapshot of the buffer.
    /// Returns whether the transport accepted it.
    pub fn tick(&mut self, surface: &CommandSurface) -> bool {
        let frame = DmxFrame::from_channels(&surface.snapshot());

        match self.transport.send_frame(&frame, &self.timing) {
            Ok(()) => {
                if self.stats.consecutive_failures > 0 {
                    tracing::info!(
                        "DMX output on {} recovered after {} failed frames",
                        self.transport.name(),
                        self.stats.consecutive_failures
                    );
                    self.sink.emit(EngineEvent::TransmissionRecovered {
                        transport: self.transport.name().to_string(),
                        failed_frames: self.stats.consecutive_failures,
                    });
                    self.stats.consecutive_failures = 0;
                }
                self.stats.frames_sent += 1;
                tracing::trace!("Sent DMX frame {}", self.stats.frames_sent);
                true
            }
            Err(e) => {
                if self.stats.consecutive_failures == 0 {
                    tracing::warn!("DMX output on {} failing: {}", self.transport.name(), e);
                    self.sink.emit(EngineEvent::TransmissionFailed {
                        transport: self.transport.name().to_string(),
                        error: e.to_string(),
                    });
                }
                self.stats.consecutive_failures += 1;
                self.stats.frames_failed += 1;
                false
            }
        }
    }

    pub fn stats(&self) -> TransmitStats {
        self.stats
    }

    pub fn timing(&self) -> &FrameTiming {
        &self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dmx::FixtureConfig;
    use crate::events::ChannelSink;
    use crate::scene::NullSceneStore;
    use crate::{error::ControlError, Result};
    use parking_lot::Mutex;

    /// Fails while `fail` is set, records delivered frames
    struct FlakyTransport {
        fail: Arc<Mutex<bool>>,
        frames: Arc<Mutex<Vec<DmxFrame>>>,
    }

    impl DmxTransport for FlakyTransport {
        fn name(&self) -> &str {
            "flaky"
        }

        fn send_frame(&mut self, frame: &DmxFrame, _timing: &FrameTiming) -> Result<()> {
            if *self.fail.lock() {
                return Err(ControlError::Transport("line down".to_string()));
            }
            self.frames.lock().push(frame.clone());
            Ok(())
        }
    }

    #[test]
    fn test_failure_logged_once_and_recovery_reported() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink: Arc<dyn EventSink> = Arc::new(ChannelSink::new(tx));
        let surface =
            CommandSurface::new(FixtureConfig::default(), Arc::new(NullSceneStore), sink.clone())
                .unwrap();

        let fail = Arc::new(Mutex::new(true));
        let frames = Arc::new(Mutex::new(Vec::new()));
        let mut transmitter = Transmitter::new(
            Box::new(FlakyTransport {
                fail: fail.clone(),
                frames: frames.clone(),
            }),
            FrameTiming::default(),
            sink,
        );

        for _ in 0..5 {
            assert!(!transmitter.tick(&surface));
        }
        surface.set_channel(0, 0, 128).unwrap();
        *fail.lock() = false;
        assert!(transmitter.tick(&surface));

        let stats = transmitter.stats();
        assert_eq!(stats.frames_failed, 5);
        assert_eq!(stats.frames_sent, 1);
        assert_eq!(stats.consecutive_failures, 0);

        let events: Vec<EngineEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::TransmissionFailed { .. }));
        assert_eq!(
            events[1],
            EngineEvent::TransmissionRecovered {
                transport: "flaky".to_string(),
                failed_frames: 5
            }
        );

        let sent = frames.lock();
        assert_eq!(sent[0].start_code(), 0);
        assert_eq!(sent[0].channels()[0], 128);
    }
}

//! Frame transports
//!
//! A transport puts one frame on the line per call. It reports an
//! unavailable or failing line as an error; the transmitter decides what
//! to do about it.

use super::frame::{DmxFrame, FrameTiming};
use crate::Result;

/// Byte-stream sink for DMX frames
pub trait DmxTransport: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Send break, mark-after-break and the frame bytes.
    /// Must return within a bounded time.
    fn send_frame(&mut self, frame: &DmxFrame, timing: &FrameTiming) -> Result<()>;
}

/// Transport that discards every frame
#[derive(Debug, Default)]
pub struct NullTransport;

impl DmxTransport for NullTransport {
    fn name(&self) -> &str {
        "null"
    }

    fn send_frame(&mut self, _frame: &DmxFrame, _timing: &FrameTiming) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(feature = "serial")]
mod serial {
    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::Write;
    use std::time::Duration;

    use super::DmxTransport;
    use crate::dmx::frame::{DmxFrame, FrameTiming};
    use crate::{error::ControlError, Result};

    /// UART transport for an RS-485 line driver (e.g. MAX485 on /dev/serial0)
    pub struct SerialTransport {
        path: String,
        baud_rate: u32,
        timeout: Duration,
        port: Option<Box<dyn SerialPort>>,
    }

    impl SerialTransport {
        /// Create a transport for `path`. If the port cannot be opened now
        /// the transport starts out unavailable and retries on every send.
        pub fn new(path: &str, baud_rate: u32, timeout: Duration) -> Self {
            let mut transport = Self {
                path: path.to_string(),
                baud_rate,
                timeout,
                port: None,
            };
            if let Err(e) = transport.connect() {
                tracing::warn!("Serial port {} not available yet: {}", path, e);
            }
            transport
        }

        /// Whether the port is currently open
        pub fn is_open(&self) -> bool {
            self.port.is_some()
        }

        fn connect(&mut self) -> Result<()> {
            let port = serialport::new(self.path.as_str(), self.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::Two)
                .flow_control(FlowControl::None)
                .timeout(self.timeout)
                .open()
                .map_err(|e| {
                    ControlError::Transport(format!("Failed to open {}: {}", self.path, e))
                })?;

            tracing::info!("Opened serial port {} @ {} baud", self.path, self.baud_rate);
            self.port = Some(port);
            Ok(())
        }
    }

    fn write_frame(
        port: &mut dyn SerialPort,
        frame: &DmxFrame,
        timing: &FrameTiming,
    ) -> std::result::Result<(), String> {
        port.set_break().map_err(|e| format!("break: {}", e))?;
        std::thread::sleep(timing.break_time);
        port.clear_break().map_err(|e| format!("clear break: {}", e))?;
        std::thread::sleep(timing.mark_after_break);

        port.write_all(frame.as_bytes())
            .map_err(|e| format!("write: {}", e))?;
        port.flush().map_err(|e| format!("flush: {}", e))
    }

    impl DmxTransport for SerialTransport {
        fn name(&self) -> &str {
            &self.path
        }

        fn send_frame(&mut self, frame: &DmxFrame, timing: &FrameTiming) -> Result<()> {
            if self.port.is_none() {
                self.connect()?;
            }
            let Some(port) = self.port.as_mut() else {
                return Err(ControlError::Transport(format!("{} is not open", self.path)));
            };

            if let Err(e) = write_frame(&mut **port, frame, timing) {
                // Drop the handle so the next tick reopens the device
                self.port = None;
                return Err(ControlError::Transport(format!("{}: {}", self.path, e)));
            }
            Ok(())
        }
    }

}

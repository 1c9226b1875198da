use std::io::Write;
use std::thread;
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, trace, warn};

use crate::config::SerialConfig;
use crate::error::{Error, Result};
use crate::frame::{hex_dump, BLANK_FRAME, FRAME_LEN};

/// Writes command frames to the LED register
///
/// The sink is owned for the lifetime of the output. On drop the LEDs are
/// blanked (best effort) if that has not happened yet, then the sink is
/// released.
pub struct LedOutput<W: Write> {
    writer: W,
    name: String,
    frames_sent: u64,
    blanked: bool,
}

impl LedOutput<Box<dyn SerialPort>> {
    /// Open the serial device, 8N1 without flow control
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let mut port = serialport::new(&config.port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|source| Error::DeviceOpen {
                port: config.port.clone(),
                source,
            })?;

        // Boards that reset on DTR need it asserted before they listen
        if let Err(e) = port.write_data_terminal_ready(true) {
            warn!("Failed to set DTR on {}: {}", config.port, e);
        }

        // Allow device to initialize
        thread::sleep(Duration::from_millis(100));

        debug!("Opened {} @ {} baud", config.port, config.baud_rate);

        Ok(LedOutput::new(port, config.port.clone()))
    }
}

impl<W: Write> LedOutput<W> {
    pub fn new(writer: W, name: impl Into<String>) -> Self {
        LedOutput {
            writer,
            name: name.into(),
            frames_sent: 0,
            blanked: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write one frame in a single call and flush it out
    pub fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<()> {
        trace!("[{}] frame: {}", self.name, hex_dump(frame));

        self.writer.write_all(frame)?;
        self.writer.flush()?;

        self.frames_sent += 1;
        self.blanked = false;
        Ok(())
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Turn every LED off, errors are logged and swallowed
    pub fn blank(&mut self) {
        if let Err(e) = self
            .writer
            .write_all(&BLANK_FRAME)
            .and_then(|_| self.writer.flush())
        {
            warn!("Failed to blank LEDs on {}: {}", self.name, e);
        }
        self.blanked = true;
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: Write> Drop for LedOutput<W> {
    fn drop(&mut self) {
        if !self.blanked {
            self.blank();
        }
    }
}

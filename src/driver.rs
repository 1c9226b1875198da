use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::{Config, Mode};
use crate::duty_cycle::{led_bits, Level, LED_COUNT};
use crate::error::Result;
use crate::frame::{encode_frame, pack};
use crate::output::LedOutput;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Runs one of the frame loops against an LED output until stopped
pub struct Driver<W: Write> {
    output: LedOutput<W>,
    mode: Mode,
    levels: [Level; LED_COUNT],
    counter_interval: Duration,
    tick_interval: Duration,
    max_ticks: Option<u64>,
    running: Arc<AtomicBool>,
    stats: bool,
}

impl<W: Write> Driver<W> {
    pub fn new(output: LedOutput<W>, config: &Config, stats: bool) -> Self {
        Driver {
            output,
            mode: config.mode,
            levels: config.levels,
            counter_interval: Duration::from_millis(config.counter_interval_ms),
            tick_interval: Duration::from_micros(config.tick_interval_us),
            max_ticks: config.max_ticks,
            running: Arc::new(AtomicBool::new(true)),
            stats,
        }
    }

    /// Get a clone of the running flag for signal handlers
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    #[cfg(test)]
    pub fn output(&self) -> &LedOutput<W> {
        &self.output
    }

    /// Run the configured mode, returns the number of frames sent
    pub fn run(&mut self) -> Result<u64> {
        info!("Driving {} in {:?} mode", self.output.name(), self.mode);
        if let Some(limit) = self.max_ticks {
            debug!("Stopping after {} frames", limit);
        }

        match self.mode {
            Mode::Pwm => self.run_pwm()?,
            Mode::Counter => self.run_counter()?,
        }

        Ok(self.output.frames_sent())
    }

    /// Software PWM: one frame per tick, 256 ticks per period
    pub fn run_pwm(&mut self) -> Result<()> {
        for (led, level) in self.levels.iter().enumerate() {
            debug!(
                "LED {}: level {} ({}/256 ticks on)",
                led,
                level.value(),
                level.on_ticks_per_period()
            );
        }

        let mut stats = Stats::new();
        let mut tick: u8 = 0;

        while self.should_continue() {
            let bits = led_bits(tick, &self.levels);
            self.output.send_frame(&encode_frame(pack(&bits)))?;
            tick = tick.wrapping_add(1);

            self.report(&mut stats);
            if !self.tick_interval.is_zero() {
                thread::sleep(self.tick_interval);
            }
        }

        Ok(())
    }

    /// Linear counter demo: writes 0..=255 in order, then wraps
    pub fn run_counter(&mut self) -> Result<()> {
        let mut stats = Stats::new();
        let mut count: u8 = 0;

        while self.should_continue() {
            self.output.send_frame(&encode_frame(count))?;
            count = count.wrapping_add(1);

            self.report(&mut stats);
            thread::sleep(self.counter_interval);
        }

        Ok(())
    }

    /// Turn the LEDs off and report totals
    pub fn shutdown(&mut self) {
        debug!("Turning off LEDs...");
        self.output.blank();
        info!("Stopped after {} frames", self.output.frames_sent());
    }

    fn should_continue(&self) -> bool {
        if !self.running.load(Ordering::Relaxed) {
            return false;
        }
        match self.max_ticks {
            Some(limit) => self.output.frames_sent() < limit,
            None => true,
        }
    }

    fn report(&self, stats: &mut Stats) {
        if !self.stats {
            return;
        }
        if let Some(fps) = stats.sample(self.output.frames_sent()) {
            debug!("[Stats] {}: {:.1} fps", self.output.name(), fps);
        }
    }
}

/// Frame rate sampled over fixed intervals
struct Stats {
    last_report: Instant,
    last_frames: u64,
}

impl Stats {
    fn new() -> Self {
        Stats {
            last_report: Instant::now(),
            last_frames: 0,
        }
    }

    fn sample(&mut self, frames: u64) -> Option<f64> {
        let elapsed = self.last_report.elapsed();
        if elapsed < STATS_INTERVAL {
            return None;
        }
        let fps = (frames - self.last_frames) as f64 / elapsed.as_secs_f64();
        self.last_report = Instant::now();
        self.last_frames = frames;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::frame::BLANK_FRAME;
    use crate::output::tests::{BrokenPipe, SharedSink};

    fn config(mode: Mode, max_ticks: u64) -> Config {
        Config {
            mode,
            max_ticks: Some(max_ticks),
            counter_interval_ms: 0,
            ..Config::default()
        }
    }

    fn data_bytes(written: &[u8]) -> Vec<u8> {
        written
            .chunks(2)
            .map(|frame| {
                assert_eq!(frame[0], 0x03);
                frame[1]
            })
            .collect()
    }

    #[test]
    fn test_pwm_period_single_led_level_one() {
        let mut cfg = config(Mode::Pwm, 256);
        cfg.levels = [Level::OFF; LED_COUNT];
        cfg.levels[0] = Level::new(1).unwrap();

        let mut driver = Driver::new(LedOutput::new(Vec::new(), "test"), &cfg, false);
        assert_eq!(driver.run().unwrap(), 256);

        let bytes = data_bytes(driver.output().get_ref());
        let on: Vec<usize> = bytes
            .iter()
            .enumerate()
            .filter(|(_, b)| **b & 1 == 1)
            .map(|(t, _)| t)
            .collect();
        assert_eq!(on, vec![0, 64, 128, 192]);
    }

    #[test]
    fn test_pwm_period_level_two() {
        let mut cfg = config(Mode::Pwm, 256);
        cfg.levels = [Level::OFF; LED_COUNT];
        cfg.levels[3] = Level::new(2).unwrap();

        let mut driver = Driver::new(LedOutput::new(Vec::new(), "test"), &cfg, false);
        driver.run().unwrap();

        let bytes = data_bytes(driver.output().get_ref());
        let on: Vec<usize> = bytes
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == 0b0000_1000)
            .map(|(t, _)| t)
            .collect();
        assert_eq!(on, (0..256usize).step_by(32).collect::<Vec<_>>());
        assert_eq!(bytes.iter().filter(|&&b| b == 0).count(), 256 - 8);
    }

    #[test]
    fn test_pwm_default_levels_pattern() {
        let cfg = config(Mode::Pwm, 257);
        let mut driver = Driver::new(LedOutput::new(Vec::new(), "test"), &cfg, false);
        driver.run().unwrap();

        let bytes = data_bytes(driver.output().get_ref());
        assert_eq!(bytes.len(), 257);
        assert_eq!(bytes[0], 0xff);
        assert_eq!(bytes[1], 0x80);
        // tick 3 lights level 7 (divisor 3) and level 8
        assert_eq!(bytes[3], 0xc0);
        // tick counter wraps back to 0 after 255
        assert_eq!(bytes[256], 0xff);
    }

    #[test]
    fn test_counter_wraps() {
        let cfg = config(Mode::Counter, 258);
        let mut driver = Driver::new(LedOutput::new(Vec::new(), "test"), &cfg, false);
        assert_eq!(driver.run().unwrap(), 258);

        let bytes = data_bytes(driver.output().get_ref());
        assert_eq!(&bytes[..3], &[0, 1, 2]);
        assert_eq!(bytes[255], 255);
        assert_eq!(&bytes[256..], &[0, 1]);
    }

    #[test]
    fn test_cleared_flag_stops_before_first_frame() {
        let cfg = config(Mode::Pwm, 10);
        let mut driver = Driver::new(LedOutput::new(Vec::new(), "test"), &cfg, false);
        driver.get_running_flag().store(false, Ordering::Relaxed);
        assert_eq!(driver.run().unwrap(), 0);
        assert!(driver.output().get_ref().is_empty());
    }

    #[test]
    fn test_write_failure_stops_loop() {
        let cfg = config(Mode::Pwm, 10);
        let mut driver = Driver::new(LedOutput::new(BrokenPipe, "test"), &cfg, false);
        assert!(matches!(driver.run(), Err(Error::Write(_))));
    }

    #[test]
    fn test_shutdown_blanks_once() {
        let sink = SharedSink::default();
        {
            let cfg = config(Mode::Counter, 2);
            let mut driver = Driver::new(LedOutput::new(sink.clone(), "test"), &cfg, false);
            driver.run().unwrap();
            driver.shutdown();
        }
        let mut expected = vec![0x03, 0x00, 0x03, 0x01];
        expected.extend_from_slice(&BLANK_FRAME);
        assert_eq!(*sink.0.borrow(), expected);
    }
}

use serde::{Deserialize, Serialize};

use crate::duty_cycle::{default_levels, Level, LED_COUNT};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub mode: Mode,
    /// Brightness level per LED, index 0 is bit 0 of the register
    pub levels: [Level; LED_COUNT],
    /// Pause between frames in counter mode
    pub counter_interval_ms: u64,
    /// Pause between PWM ticks, 0 runs as fast as the port accepts frames
    pub tick_interval_us: u64,
    /// Stop after this many frames, run until interrupted when unset
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

/// Which loop drives the register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Software PWM over the configured brightness levels
    #[default]
    Pwm,
    /// Linear 0..=255 counter demo
    Counter,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            serial: SerialConfig::default(),
            mode: Mode::Pwm,
            levels: default_levels(),
            counter_interval_ms: 10,
            tick_interval_us: 0,
            max_ticks: None,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
            timeout_ms: 1000,
        }
    }
}

/// Parse a comma separated list of exactly eight levels, e.g. "0,1,2,3,4,5,6,8"
pub fn parse_levels(list: &str) -> Result<[Level; LED_COUNT]> {
    let raw: Vec<&str> = list.split(',').map(str::trim).collect();
    if raw.len() != LED_COUNT {
        return Err(Error::Config(format!(
            "expected {} levels, got {}",
            LED_COUNT,
            raw.len()
        )));
    }

    let mut levels = [Level::OFF; LED_COUNT];
    for (slot, item) in levels.iter_mut().zip(raw) {
        let value: u8 = item
            .parse()
            .map_err(|_| Error::Config(format!("level '{}' is not a number", item)))?;
        *slot = Level::new(value)?;
    }

    Ok(levels)
}

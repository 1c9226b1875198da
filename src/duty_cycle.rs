use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Number of LEDs on the register
pub const LED_COUNT: usize = 8;

/// Highest brightness level (always on)
pub const MAX_LEVEL: u8 = 8;

/// Divisors for levels 1..=7. Level 0 and 8 are unconditional.
const DIVISORS: [u8; 7] = [64, 32, 24, 16, 10, 5, 3];

/// Brightness level of a single LED, 0 (off) to 8 (fully on)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level(u8);

impl Level {
    pub const OFF: Level = Level(0);
    pub const FULL: Level = Level(MAX_LEVEL);

    pub fn new(level: u8) -> Result<Self> {
        if level > MAX_LEVEL {
            return Err(Error::InvalidLevel(level));
        }
        Ok(Level(level))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Tick divisor for intermediate levels, `None` for 0 and 8
    pub fn divisor(self) -> Option<u8> {
        match self.0 {
            1..=7 => Some(DIVISORS[self.0 as usize - 1]),
            _ => None,
        }
    }

    /// Number of on-ticks over one 256-tick period
    pub fn on_ticks_per_period(self) -> u16 {
        (0..=u8::MAX).filter(|&tick| evaluate(tick, self)).count() as u16
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = u8::deserialize(deserializer)?;
        Level::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Levels used when nothing is configured: LED i gets level i + 1
pub fn default_levels() -> [Level; LED_COUNT] {
    [1, 2, 3, 4, 5, 6, 7, 8].map(Level)
}

/// Whether an LED at `level` is on at `tick`
pub fn evaluate(tick: u8, level: Level) -> bool {
    match level.divisor() {
        Some(divisor) => tick % divisor == 0,
        None => level == Level::FULL,
    }
}

/// Evaluate every LED for one tick
pub fn led_bits(tick: u8, levels: &[Level; LED_COUNT]) -> [bool; LED_COUNT] {
    (*levels).map(|level| evaluate(tick, level))
}

use crate::constants::{BYTE_TIMEOUT_MS, FLAG_CLEAR, FLAG_SET, RESPONSE_DELAY_MS};

/// Whether the sensor pushes info frames on its own.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputMode {
    /// The sensor transmits an info frame autonomously at its own cadence.
    Auto,
    /// The sensor only answers commands.
    Passive,
}

impl OutputMode {
    pub(crate) fn flag(self) -> u8 {
        match self {
            OutputMode::Auto => FLAG_SET,
            OutputMode::Passive => FLAG_CLEAR,
        }
    }

    pub(crate) fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            FLAG_SET => Some(OutputMode::Auto),
            FLAG_CLEAR => Some(OutputMode::Passive),
            _ => None,
        }
    }
}

/// Level driven on the STATUS pin while an alarm is raised.
///
/// The pin idles at the opposite level.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmLevel {
    High,
    Low,
}

impl AlarmLevel {
    pub(crate) fn flag(self) -> u8 {
        match self {
            AlarmLevel::High => FLAG_SET,
            AlarmLevel::Low => FLAG_CLEAR,
        }
    }

    pub(crate) fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            FLAG_SET => Some(AlarmLevel::High),
            FLAG_CLEAR => Some(AlarmLevel::Low),
            _ => None,
        }
    }
}

/// Configuration settings for the BM22S4221-1 driver.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// Output mode written during `init`, left untouched when `None`.
    pub output_mode: Option<OutputMode>,
    /// Alarm level written during `init`, left untouched when `None`.
    pub alarm_level: Option<AlarmLevel>,
    /// Longest wait for each reply byte, in milliseconds.
    pub byte_timeout_ms: u32,
    /// Pause after every command frame, in milliseconds.
    pub response_delay_ms: u32,
}

impl Config {
    /// Creates a new `Config` that applies the given sensor settings on `init`.
    ///
    /// # Arguments
    ///
    /// * `output_mode` - The `OutputMode` to apply, if any.
    /// * `alarm_level` - The `AlarmLevel` to apply, if any.
    pub fn new(output_mode: Option<OutputMode>, alarm_level: Option<AlarmLevel>) -> Config {
        Config {
            output_mode,
            alarm_level,
            ..Config::default()
        }
    }

    /// Sets the output mode applied on `init`.
    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = Some(mode);
        self
    }

    /// Sets the alarm level applied on `init`.
    pub fn alarm_level(mut self, level: AlarmLevel) -> Self {
        self.alarm_level = Some(level);
        self
    }

    /// Sets the per-byte reply timeout.
    pub fn byte_timeout_ms(mut self, timeout: u32) -> Self {
        self.byte_timeout_ms = timeout;
        self
    }

    /// Sets the pause that follows every command frame.
    pub fn response_delay_ms(mut self, delay: u32) -> Self {
        self.response_delay_ms = delay;
        self
    }
}

/// Provides default configuration values for the BM22S4221-1 driver.
impl Default for Config {
    /// Returns the default configuration.
    ///
    /// Nothing is written to the sensor on `init`, and the protocol timings are used.
    fn default() -> Config {
        Config {
            output_mode: None,
            alarm_level: None,
            byte_timeout_ms: BYTE_TIMEOUT_MS,
            response_delay_ms: RESPONSE_DELAY_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output_mode, None);
        assert_eq!(config.alarm_level, None);
        assert_eq!(config.byte_timeout_ms, 10);
        assert_eq!(config.response_delay_ms, 70);
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .output_mode(OutputMode::Auto)
            .alarm_level(AlarmLevel::Low)
            .byte_timeout_ms(25);
        assert_eq!(config.output_mode, Some(OutputMode::Auto));
        assert_eq!(config.alarm_level, Some(AlarmLevel::Low));
        assert_eq!(config.byte_timeout_ms, 25);
        assert_eq!(config.response_delay_ms, 70);
    }

    #[test]
    fn test_flags() {
        assert_eq!(OutputMode::Auto.flag(), 0x08);
        assert_eq!(OutputMode::from_flag(0x00), Some(OutputMode::Passive));
        assert_eq!(AlarmLevel::from_flag(0x08), Some(AlarmLevel::High));
        assert_eq!(AlarmLevel::from_flag(0x01), None);
    }
}

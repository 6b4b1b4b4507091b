use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 120;
pub const DEFAULT_STANDARD_INTERVAL_MINUTES: u32 = 5;
pub const DEFAULT_PAUSE_THRESHOLD_MINUTES: u32 = 30;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be between 1 and 120 minutes, got {value}")]
    OutOfRange { field: &'static str, value: u32 },
    #[error(
        "pause threshold ({pause} min) must be greater than the standard interval ({standard} min)"
    )]
    PauseNotAboveInterval { standard: u32, pause: u32 },
}

fn default_standard() -> u32 {
    DEFAULT_STANDARD_INTERVAL_MINUTES
}

fn default_pause() -> u32 {
    DEFAULT_PAUSE_THRESHOLD_MINUTES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_standard")]
    pub standard_interval_minutes: u32,
    #[serde(default = "default_pause")]
    pub pause_threshold_minutes: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            standard_interval_minutes: DEFAULT_STANDARD_INTERVAL_MINUTES,
            pause_threshold_minutes: DEFAULT_PAUSE_THRESHOLD_MINUTES,
        }
    }
}

impl TimerConfig {
    /// Builds a validated configuration.
    pub fn new(standard_interval_minutes: u32, pause_threshold_minutes: u32) -> Result<Self, ConfigError> {
        let config = Self {
            standard_interval_minutes,
            pause_threshold_minutes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("standard_interval_minutes", self.standard_interval_minutes)?;
        check_range("pause_threshold_minutes", self.pause_threshold_minutes)?;
        if self.pause_threshold_minutes <= self.standard_interval_minutes {
            return Err(ConfigError::PauseNotAboveInterval {
                standard: self.standard_interval_minutes,
                pause: self.pause_threshold_minutes,
            });
        }
        Ok(())
    }

    pub fn standard_interval(&self) -> Duration {
        minutes(self.standard_interval_minutes)
    }

    /// Time left in the pause window once a pause has been observed on a poll.
    pub fn pause_window(&self) -> Duration {
        minutes(
            self.pause_threshold_minutes
                .saturating_sub(self.standard_interval_minutes),
        )
    }
}

fn check_range(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if !(MIN_MINUTES..=MAX_MINUTES).contains(&value) {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}

fn minutes(value: u32) -> Duration {
    Duration::from_secs(u64::from(value) * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = TimerConfig::new(5, 30).unwrap();
        assert_eq!(config.standard_interval(), Duration::from_secs(300));
        assert_eq!(config.pause_window(), Duration::from_secs(25 * 60));
        assert_eq!(TimerConfig::default(), config);
    }

    #[test]
    fn test_bounds() {
        assert!(TimerConfig::new(1, 120).is_ok());
        assert_eq!(
            TimerConfig::new(0, 30),
            Err(ConfigError::OutOfRange {
                field: "standard_interval_minutes",
                value: 0
            })
        );
        assert_eq!(
            TimerConfig::new(5, 121),
            Err(ConfigError::OutOfRange {
                field: "pause_threshold_minutes",
                value: 121
            })
        );
    }

    #[test]
    fn test_pause_must_exceed_interval() {
        assert_eq!(
            TimerConfig::new(10, 10),
            Err(ConfigError::PauseNotAboveInterval {
                standard: 10,
                pause: 10
            })
        );
        assert!(TimerConfig::new(10, 11).is_ok());
    }

    #[test]
    fn test_defaults_from_partial_table() {
        let config: TimerConfig = toml::from_str("standard_interval_minutes = 2").unwrap();
        assert_eq!(config.standard_interval_minutes, 2);
        assert_eq!(config.pause_threshold_minutes, 30);
    }
}

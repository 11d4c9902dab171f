use std::collections::HashSet;
use std::time::Duration;

use strum_macros::{Display, EnumString};

use crate::constants::*;
use crate::error::ConfigError;
use crate::types::{AngleMapper, Channel};

/// Where a demo loop may notice that the operator asked it to stop.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ExitCheck {
    /// Only when the loop comes back around to the first pattern.
    #[default]
    CycleStart,
    /// Before any pattern starts.
    PatternStart,
    /// As soon as the input arrives.
    Immediate,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub channels: Vec<Channel>,
    pub mapper: AngleMapper,
    pub neutral_angle: i64,
    pub speed: u16,
    pub acceleration: u8,
    pub demo_trigger: char,
    pub step_delay: Duration,
    pub pattern_pause: Duration,
    pub exit_check: ExitCheck,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            channels: DEFAULT_CHANNELS.iter().filter_map(|&c| Channel::new(c).ok()).collect(),
            mapper: AngleMapper::default(),
            neutral_angle: NEUTRAL_ANGLE,
            speed: DEFAULT_SPEED,
            acceleration: DEFAULT_ACCELERATION,
            demo_trigger: DEMO_TRIGGER,
            step_delay: STEP_DELAY,
            pattern_pause: PATTERN_PAUSE,
            exit_check: ExitCheck::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let mut seen = HashSet::with_capacity(self.channels.len());
        for channel in &self.channels {
            if !seen.insert(*channel) {
                return Err(ConfigError::DuplicateChannel(channel.index()));
            }
        }

        self.mapper.validate()?;
        if !self.mapper.contains(self.neutral_angle) {
            return Err(ConfigError::NeutralOutOfRange(self.neutral_angle));
        }

        let trigger = self.demo_trigger;
        if trigger.is_ascii_digit() || trigger == '-' || trigger == '+' || trigger.is_whitespace() {
            return Err(ConfigError::InvalidTrigger(trigger));
        }
        Ok(())
    }

    pub fn neutral_target(&self) -> u16 {
        self.mapper.map(self.neutral_angle)
    }
}

use std::fmt;

use crate::constants::{MAX_ANGLE, MAX_CHANNEL, MAX_TARGET, MIN_ANGLE, MIN_TARGET};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    pub fn new(index: u8) -> Result<Self, ConfigError> {
        if index > MAX_CHANNEL {
            return Err(ConfigError::ChannelOutOfRange(index));
        }
        Ok(Channel(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single position command: one channel, one target in quarter-microseconds.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ServoCommand {
    pub channel: Channel,
    pub target: u16,
}

/// Linear map from a bounded angle in degrees onto the device's pulse-width range.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AngleMapper {
    pub min_angle: i64,
    pub max_angle: i64,
    pub min_target: u16,
    pub max_target: u16,
}

impl Default for AngleMapper {
    fn default() -> Self {
        AngleMapper {
            min_angle: MIN_ANGLE,
            max_angle: MAX_ANGLE,
            min_target: MIN_TARGET,
            max_target: MAX_TARGET,
        }
    }
}

impl AngleMapper {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_angle >= self.max_angle {
            return Err(ConfigError::EmptyAngleRange {
                min: self.min_angle,
                max: self.max_angle,
            });
        }
        if self.min_target >= self.max_target {
            return Err(ConfigError::EmptyTargetRange {
                min: self.min_target,
                max: self.max_target,
            });
        }
        Ok(())
    }

    pub fn contains(&self, angle: i64) -> bool {
        (self.min_angle..=self.max_angle).contains(&angle)
    }

    pub fn clamp(&self, angle: i64) -> i64 {
        angle.max(self.min_angle).min(self.max_angle)
    }

    pub fn center(&self) -> i64 {
        let sum = i128::from(self.min_angle) + i128::from(self.max_angle);
        // Lies between min_angle and max_angle, so it fits back into i64.
        sum.div_euclid(2) as i64
    }

    /// Clamps `angle` into the bound, then interpolates. Never fails.
    ///
    /// Works in `i128` so that any `i64` bound can be spanned without overflow.
    pub fn map(&self, angle: i64) -> u16 {
        let offset = i128::from(self.clamp(angle)) - i128::from(self.min_angle);
        let span_in = i128::from(self.max_angle) - i128::from(self.min_angle);
        let span_out = i128::from(self.max_target) - i128::from(self.min_target);

        let target = i128::from(self.min_target) + offset * span_out / span_in;
        // Clamping above keeps this inside min_target..=max_target.
        target as u16
    }
}

use std::time::Duration;

use clap::Parser;

use crate::config::{Config, ExitCheck};
use crate::constants::*;
use crate::error::ConfigError;
use crate::protocol::Protocol;
use crate::types::{AngleMapper, Channel};

#[derive(Debug, Parser)]
#[command(name = "maestro_demo", about = "Move Maestro servos by angle or run demo patterns")]
pub struct Args {
    /// Serial port the Maestro is attached to
    #[arg(long, default_value = DEFAULT_PORT)]
    pub port: String,

    #[arg(long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// Serial read timeout
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Use the Pololu protocol with this device number instead of the compact protocol
    #[arg(long)]
    pub device_number: Option<u8>,

    /// Enabled channel, repeat for several
    #[arg(long = "channel", value_name = "CHANNEL", default_values_t = DEFAULT_CHANNELS)]
    pub channels: Vec<u8>,

    #[arg(long, default_value_t = MIN_ANGLE, allow_negative_numbers = true)]
    pub min_angle: i64,

    #[arg(long, default_value_t = MAX_ANGLE, allow_negative_numbers = true)]
    pub max_angle: i64,

    #[arg(long, default_value_t = NEUTRAL_ANGLE, allow_negative_numbers = true)]
    pub neutral_angle: i64,

    /// Maestro speed limit, 0 for unlimited
    #[arg(long, default_value_t = DEFAULT_SPEED)]
    pub speed: u16,

    /// Maestro acceleration limit, 0 for unlimited
    #[arg(long, default_value_t = DEFAULT_ACCELERATION)]
    pub acceleration: u8,

    /// Line prefix that starts demo mode
    #[arg(long, default_value_t = DEMO_TRIGGER)]
    pub trigger: char,

    /// Hold time of each demo step
    #[arg(long, default_value_t = STEP_DELAY.as_millis() as u64)]
    pub step_ms: u64,

    /// Pause between demo patterns
    #[arg(long, default_value_t = PATTERN_PAUSE.as_millis() as u64)]
    pub pause_ms: u64,

    /// When a running demo notices a stop request: cycle-start, pattern-start or immediate
    #[arg(long, default_value_t = ExitCheck::CycleStart)]
    pub exit_check: ExitCheck,

    /// Seed for the random pattern
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Args {
    pub fn protocol(&self) -> Protocol {
        match self.device_number {
            Some(device_number) => Protocol::Pololu { device_number },
            None => Protocol::Compact,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn config(&self) -> Result<Config, ConfigError> {
        let channels = self
            .channels
            .iter()
            .map(|&c| Channel::new(c))
            .collect::<Result<Vec<_>, _>>()?;

        let config = Config {
            channels,
            mapper: AngleMapper {
                min_angle: self.min_angle,
                max_angle: self.max_angle,
                ..AngleMapper::default()
            },
            neutral_angle: self.neutral_angle,
            speed: self.speed,
            acceleration: self.acceleration,
            demo_trigger: self.trigger,
            step_delay: Duration::from_millis(self.step_ms),
            pattern_pause: Duration::from_millis(self.pause_ms),
            exit_check: self.exit_check,
        };
        config.validate()?;
        Ok(config)
    }
}

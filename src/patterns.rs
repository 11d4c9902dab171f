use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::config::Config;
use crate::constants::RANDOM_ITERATIONS;
use crate::types::ServoCommand;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumIter)]
pub enum MotionPattern {
    RandomPositions,
    SynchronizedSweep,
    WaveSweep,
}

/// One move of a pattern: commands sent together, then held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub commands: Vec<ServoCommand>,
    pub hold: Duration,
}

impl MotionPattern {
    /// Expands the pattern for the configured channels. Only `RandomPositions`
    /// draws from `rng`.
    pub fn steps<R: Rng>(self, config: &Config, rng: &mut R) -> Vec<Step> {
        let mapper = &config.mapper;
        let (min, center, max) = (mapper.min_angle, mapper.center(), mapper.max_angle);

        let step = |angle_of: &dyn Fn(usize) -> i64| Step {
            commands: config
                .channels
                .iter()
                .enumerate()
                .map(|(i, &channel)| ServoCommand {
                    channel,
                    target: mapper.map(angle_of(i)),
                })
                .collect(),
            hold: config.step_delay,
        };

        match self {
            MotionPattern::RandomPositions => (0..RANDOM_ITERATIONS)
                .map(|_| {
                    let angles: Vec<i64> =
                        config.channels.iter().map(|_| rng.gen_range(min..=max)).collect();
                    step(&|i| angles[i])
                })
                .collect(),
            MotionPattern::SynchronizedSweep => {
                [max, min, center].into_iter().map(|angle| step(&|_| angle)).collect()
            }
            MotionPattern::WaveSweep => {
                let presets = [max, center, min];
                let mut steps: Vec<Step> = (0..presets.len())
                    .map(|k| step(&|i| presets[(i + k) % presets.len()]))
                    .collect();
                steps.push(step(&|_| center));
                steps
            }
        }
    }

    /// Length of one pass through every pattern, pauses included.
    pub fn cycle_duration(config: &Config) -> Duration {
        let mut rng = StdRng::seed_from_u64(0);
        MotionPattern::iter()
            .map(|pattern| {
                let holds: Duration = pattern.steps(config, &mut rng).iter().map(|s| s.hold).sum();
                holds + config.pattern_pause
            })
            .sum()
    }
}

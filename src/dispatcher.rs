//! Command dispatch as an explicit state machine.
//!
//! The dispatcher never sleeps and never touches the device. Each input line or
//! timer expiry produces a [`Reaction`]: the servo commands to issue, what to tell
//! the operator, and when the dispatcher wants to be woken next.

use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::config::{Config, ExitCheck};
use crate::patterns::{MotionPattern, Step};
use crate::types::ServoCommand;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Input {
    Empty,
    Demo,
    Angle(i64),
    Unrecognized,
}

impl Input {
    pub fn classify(line: &str, trigger: char) -> Input {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            Input::Empty
        } else if line.starts_with(trigger) {
            Input::Demo
        } else {
            match line.trim().parse::<i64>() {
                Ok(angle) => Input::Angle(angle),
                Err(_) => Input::Unrecognized,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Notice {
    Moved { angle: i64, target: u16 },
    Rejected { angle: i64 },
    DemoStarted,
    PatternStarted(MotionPattern),
    ExitPending,
    DemoStopped,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Wake {
    /// Leave any pending timer as it is.
    Keep,
    Clear,
    After(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub commands: Vec<ServoCommand>,
    pub notices: Vec<Notice>,
    pub wake: Wake,
}

impl Reaction {
    fn none() -> Self {
        Reaction {
            commands: Vec::new(),
            notices: Vec::new(),
            wake: Wake::Keep,
        }
    }

    fn notice(notice: Notice) -> Self {
        Reaction {
            notices: vec![notice],
            ..Reaction::none()
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DispatcherState {
    Idle,
    Demo,
}

#[derive(Debug)]
enum Phase {
    Stepping(VecDeque<Step>),
    Pausing,
}

#[derive(Debug)]
struct DemoRun {
    pattern: MotionPattern,
    phase: Phase,
    exit_requested: bool,
}

pub struct Dispatcher {
    config: Config,
    demo: Option<DemoRun>,
    rng: StdRng,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Same patterns on every run for the same seed.
    pub fn with_seed(config: Config, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: Config, rng: StdRng) -> Self {
        Dispatcher {
            config,
            demo: None,
            rng,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> DispatcherState {
        match self.demo {
            Some(_) => DispatcherState::Demo,
            None => DispatcherState::Idle,
        }
    }

    pub fn handle_line(&mut self, line: &str) -> Reaction {
        let input = Input::classify(line, self.config.demo_trigger);

        if let Some(demo) = self.demo.as_mut() {
            if input == Input::Empty {
                return Reaction::none();
            }
            if demo.exit_requested {
                debug!("discarding {:?} while demo exit is pending", line);
                return Reaction::none();
            }
            if self.config.exit_check == ExitCheck::Immediate {
                return self.stop_demo();
            }
            demo.exit_requested = true;
            return Reaction::notice(Notice::ExitPending);
        }

        match input {
            Input::Empty => Reaction::none(),
            Input::Demo => self.start_demo(),
            Input::Angle(angle) if self.config.mapper.contains(angle) => self.move_all(angle),
            Input::Angle(angle) => Reaction::notice(Notice::Rejected { angle }),
            Input::Unrecognized => {
                debug!("ignoring unrecognized input {:?}", line);
                Reaction::none()
            }
        }
    }

    pub fn handle_timer(&mut self) -> Reaction {
        let Some(demo) = self.demo.as_mut() else {
            return Reaction {
                wake: Wake::Clear,
                ..Reaction::none()
            };
        };

        match &mut demo.phase {
            Phase::Stepping(steps) => match steps.pop_front() {
                Some(step) => Self::issue(step),
                None => {
                    demo.phase = Phase::Pausing;
                    Reaction {
                        wake: Wake::After(self.config.pattern_pause),
                        ..Reaction::none()
                    }
                }
            },
            Phase::Pausing => {
                let next = next_pattern(demo.pattern);
                let at_check = match self.config.exit_check {
                    ExitCheck::CycleStart => next == first_pattern(),
                    ExitCheck::PatternStart | ExitCheck::Immediate => true,
                };
                if demo.exit_requested && at_check {
                    self.stop_demo()
                } else {
                    self.begin_pattern(next)
                }
            }
        }
    }

    /// Leaves demo mode if running and recenters every channel.
    pub fn park(&mut self) -> Reaction {
        if self.demo.is_some() {
            return self.stop_demo();
        }
        Reaction {
            commands: self.neutral_commands(),
            notices: Vec::new(),
            wake: Wake::Clear,
        }
    }

    fn move_all(&self, angle: i64) -> Reaction {
        let target = self.config.mapper.map(angle);
        let commands = self
            .config
            .channels
            .iter()
            .map(|&channel| ServoCommand { channel, target })
            .collect();
        Reaction {
            commands,
            notices: vec![Notice::Moved { angle, target }],
            wake: Wake::Keep,
        }
    }

    fn start_demo(&mut self) -> Reaction {
        let mut reaction = self.begin_pattern(first_pattern());
        reaction.notices.insert(0, Notice::DemoStarted);
        reaction
    }

    fn begin_pattern(&mut self, pattern: MotionPattern) -> Reaction {
        let mut steps: VecDeque<Step> = pattern.steps(&self.config, &mut self.rng).into();
        let first = steps.pop_front();
        let exit_requested = self.demo.as_ref().is_some_and(|d| d.exit_requested);
        self.demo = Some(DemoRun {
            pattern,
            phase: Phase::Stepping(steps),
            exit_requested,
        });

        let mut reaction = match first {
            Some(step) => Self::issue(step),
            None => Reaction {
                wake: Wake::After(Duration::ZERO),
                ..Reaction::none()
            },
        };
        reaction.notices.push(Notice::PatternStarted(pattern));
        reaction
    }

    fn stop_demo(&mut self) -> Reaction {
        self.demo = None;
        Reaction {
            commands: self.neutral_commands(),
            notices: vec![Notice::DemoStopped],
            wake: Wake::Clear,
        }
    }

    fn issue(step: Step) -> Reaction {
        Reaction {
            commands: step.commands,
            notices: Vec::new(),
            wake: Wake::After(step.hold),
        }
    }

    fn neutral_commands(&self) -> Vec<ServoCommand> {
        let target = self.config.neutral_target();
        self.config.channels.iter().map(|&channel| ServoCommand { channel, target }).collect()
    }
}

fn first_pattern() -> MotionPattern {
    MotionPattern::RandomPositions
}

fn next_pattern(current: MotionPattern) -> MotionPattern {
    MotionPattern::iter()
        .cycle()
        .skip_while(|p| *p != current)
        .nth(1)
        .unwrap_or_else(first_pattern)
}

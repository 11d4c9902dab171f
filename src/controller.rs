use std::io::{self, BufRead};

use futures::{Stream, StreamExt};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::{
    config::{Config, ExitCheck},
    dispatcher::{Dispatcher, DispatcherState, Notice, Reaction, Wake},
    error::TransportError,
    protocol::MaestroErrorFlag,
    transport::ServoDevice,
    types::{Channel, ServoCommand},
};

/// Splits `reader` into lines without requiring valid UTF-8.
///
/// Undecodable bytes become U+FFFD, so a garbled line is still a line to the
/// dispatcher. The iterator ends after the first read error.
pub fn read_lines<R: BufRead>(mut reader: R) -> impl Iterator<Item = io::Result<String>> {
    let mut failed = false;
    std::iter::from_fn(move || {
        if failed {
            return None;
        }
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => Some(Ok(String::from_utf8_lossy(&buf).into_owned())),
            Err(e) => {
                failed = true;
                Some(Err(e))
            }
        }
    })
}

pub struct Controller<D> {
    device: D,
    dispatcher: Dispatcher,
}

impl<D: ServoDevice> Controller<D> {
    pub fn new(device: D, config: Config) -> Self {
        Self::with_dispatcher(device, Dispatcher::new(config))
    }

    pub fn with_dispatcher(device: D, dispatcher: Dispatcher) -> Self {
        Controller { device, dispatcher }
    }

    pub fn state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    /// Reads the error register once. Devices without the query are skipped.
    pub async fn report_errors(&mut self) -> Result<(), TransportError> {
        match self.device.get_errors().await {
            Ok(0) => info!("Controller reports no errors"),
            Ok(register) => {
                for flag in MaestroErrorFlag::decode(register) {
                    warn!("Controller error flag set: {}", flag);
                }
            }
            Err(TransportError::Unsupported) => debug!("Device cannot report errors"),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Drives the dispatcher from `input` and its own timers until input ends and
    /// no demo step is pending.
    pub async fn run<S>(&mut self, input: S) -> Result<(), TransportError>
    where
        S: Stream<Item = io::Result<String>> + Unpin,
    {
        let mut input = input.fuse();
        let mut input_open = true;
        let mut deadline: Option<Instant> = None;

        loop {
            if !input_open && deadline.is_none() {
                break;
            }

            let reaction = tokio::select! {
                line = input.next(), if input_open => match line {
                    Some(line) => self.dispatcher.handle_line(&line?),
                    None => {
                        debug!("Input closed");
                        input_open = false;
                        continue;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    self.dispatcher.handle_timer()
                }
            };

            match self.apply(reaction).await? {
                Wake::Keep => {}
                Wake::Clear => deadline = None,
                Wake::After(delay) => deadline = Some(Instant::now() + delay),
            }
        }
        Ok(())
    }

    /// Position of every enabled channel as last reported by the device.
    pub async fn positions(&mut self) -> Vec<(Channel, Result<u16, TransportError>)> {
        let channels = self.dispatcher.config().channels.clone();
        let mut positions = Vec::with_capacity(channels.len());
        for channel in channels {
            positions.push((channel, self.device.get_position(channel).await));
        }
        positions
    }

    /// Recenters every channel and leaves demo mode.
    pub async fn park(&mut self) -> Result<(), TransportError> {
        let reaction = self.dispatcher.park();
        self.apply(reaction).await?;
        Ok(())
    }

    pub async fn apply(&mut self, reaction: Reaction) -> Result<Wake, TransportError> {
        for notice in &reaction.notices {
            self.log_notice(notice);
        }
        for command in &reaction.commands {
            self.send(command).await?;
        }
        Ok(reaction.wake)
    }

    async fn send(&mut self, command: &ServoCommand) -> Result<(), TransportError> {
        let config = self.dispatcher.config();
        let (speed, acceleration) = (config.speed, config.acceleration);

        self.device.set_speed(command.channel, speed).await?;
        self.device.set_acceleration(command.channel, acceleration).await?;
        self.device.set_target(command.channel, command.target).await?;
        debug!("Channel {} -> {}", command.channel, command.target);
        Ok(())
    }

    fn log_notice(&self, notice: &Notice) {
        let mapper = &self.dispatcher.config().mapper;
        match notice {
            Notice::Moved { angle, target } => {
                info!("Moving to {} degrees (target {})", angle, target)
            }
            Notice::Rejected { angle } => warn!(
                "Angle {} must be between {} and {} degrees",
                angle, mapper.min_angle, mapper.max_angle
            ),
            Notice::DemoStarted => info!("Demo mode started, send any key to stop"),
            Notice::PatternStarted(pattern) => info!("Running {} pattern", pattern),
            Notice::ExitPending => match self.dispatcher.config().exit_check {
                ExitCheck::CycleStart => info!("Stopping demo at the end of this cycle"),
                _ => info!("Stopping demo after the current pattern"),
            },
            Notice::DemoStopped => info!("Demo mode stopped, servos centered"),
        }
    }
}

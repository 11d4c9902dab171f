mod constants;
mod types;
mod config;
mod error;
mod patterns;
mod protocol;
mod dispatcher;
mod transport;
mod controller;
pub mod cli;

pub use config::{Config, ExitCheck};
pub use controller::{read_lines, Controller};
pub use dispatcher::{Dispatcher, DispatcherState, Input, Notice, Reaction, Wake};
pub use error::{ConfigError, TransportError};
pub use patterns::{MotionPattern, Step};
pub use protocol::{decode_u16, MaestroErrorFlag, Protocol, Request};
pub use transport::{SerialTransport, ServoDevice};
pub use types::{AngleMapper, Channel, ServoCommand};

// Re-export commonly used items
pub use constants::{MAX_ANGLE, MAX_TARGET, MIN_ANGLE, MIN_TARGET, NEUTRAL_ANGLE};

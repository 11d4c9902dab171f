use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("invalid response data: expected length {expected_len} but got {actual_len}. Raw data: {raw_data:02x?}")]
    InvalidResponse {
        expected_len: usize,
        actual_len: usize,
        raw_data: Vec<u8>,
    },
    #[error("operation not supported by this device")]
    Unsupported,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("channel {0} is out of range (0-{max})", max = crate::constants::MAX_CHANNEL)]
    ChannelOutOfRange(u8),
    #[error("at least one channel must be enabled")]
    NoChannels,
    #[error("channel {0} is enabled twice")]
    DuplicateChannel(u8),
    #[error("angle range {min}..={max} is empty")]
    EmptyAngleRange { min: i64, max: i64 },
    #[error("target range {min}..={max} is empty")]
    EmptyTargetRange { min: u16, max: u16 },
    #[error("neutral angle {0} lies outside the angle range")]
    NeutralOutOfRange(i64),
    #[error("{0:?} cannot be used as the demo trigger")]
    InvalidTrigger(char),
}

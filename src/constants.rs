use std::time::Duration;

// Maestro serial defaults
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";
pub const DEFAULT_BAUD: u32 = 9600;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

// Command constants
pub const CMD_SET_TARGET: u8 = 0x84;
pub const CMD_SET_SPEED: u8 = 0x87;
pub const CMD_SET_ACCELERATION: u8 = 0x89;
pub const CMD_GET_POSITION: u8 = 0x90;
pub const CMD_GET_ERRORS: u8 = 0xA1;
pub const POLOLU_PROTOCOL_START: u8 = 0xAA;

// The largest Maestro has 24 channels
pub const MAX_CHANNEL: u8 = 23;

// Servo movement constants
pub const MIN_ANGLE: i64 = 70;
pub const MAX_ANGLE: i64 = 110;
pub const NEUTRAL_ANGLE: i64 = 90;
// Quarter-microseconds: 1000us..2000us
pub const MIN_TARGET: u16 = 4000;
pub const MAX_TARGET: u16 = 8000;

pub const DEFAULT_CHANNELS: [u8; 3] = [0, 1, 2];
pub const DEFAULT_SPEED: u16 = 0;
pub const DEFAULT_ACCELERATION: u8 = 0;

// Demo mode
pub const DEMO_TRIGGER: char = 'd';
pub const RANDOM_ITERATIONS: usize = 3;
pub const STEP_DELAY: Duration = Duration::from_millis(1000);
pub const PATTERN_PAUSE: Duration = Duration::from_millis(2000);

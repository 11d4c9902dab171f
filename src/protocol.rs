//! Maestro serial framing.
//!
//! The Maestro accepts the same commands in two framings. The compact protocol
//! sends the command byte followed by its data. The Pololu protocol prefixes
//! `0xAA` and a device number, and sends the command with its MSB cleared, so
//! several devices can share one line. Values wider than 7 bits are sent as
//! low 7 bits, then high 7 bits.

use strum_macros::{Display, EnumIter};
use strum::IntoEnumIterator;

use crate::constants::*;
use crate::types::Channel;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Protocol {
    #[default]
    Compact,
    Pololu { device_number: u8 },
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Request {
    SetTarget { channel: Channel, target: u16 },
    SetSpeed { channel: Channel, speed: u16 },
    SetAcceleration { channel: Channel, acceleration: u8 },
    GetPosition { channel: Channel },
    GetErrors,
}

impl Request {
    pub fn command(&self) -> u8 {
        match self {
            Request::SetTarget { .. } => CMD_SET_TARGET,
            Request::SetSpeed { .. } => CMD_SET_SPEED,
            Request::SetAcceleration { .. } => CMD_SET_ACCELERATION,
            Request::GetPosition { .. } => CMD_GET_POSITION,
            Request::GetErrors => CMD_GET_ERRORS,
        }
    }

    /// Number of reply bytes the device sends back.
    pub fn response_len(&self) -> usize {
        match self {
            Request::GetPosition { .. } | Request::GetErrors => 2,
            Request::SetTarget { .. }
            | Request::SetSpeed { .. }
            | Request::SetAcceleration { .. } => 0,
        }
    }

    fn data(&self) -> Vec<u8> {
        match *self {
            Request::SetTarget { channel, target } => with_14bit(channel, target),
            Request::SetSpeed { channel, speed } => with_14bit(channel, speed),
            Request::SetAcceleration { channel, acceleration } => {
                with_14bit(channel, u16::from(acceleration))
            }
            Request::GetPosition { channel } => vec![channel.index()],
            Request::GetErrors => Vec::new(),
        }
    }
}

fn with_14bit(channel: Channel, value: u16) -> Vec<u8> {
    vec![channel.index(), (value & 0x7f) as u8, ((value >> 7) & 0x7f) as u8]
}

impl Protocol {
    pub fn encode(&self, request: &Request) -> Vec<u8> {
        let data = request.data();
        let mut frame = Vec::with_capacity(data.len() + 3);
        match *self {
            Protocol::Compact => frame.push(request.command()),
            Protocol::Pololu { device_number } => {
                frame.extend_from_slice(&[
                    POLOLU_PROTOCOL_START,
                    device_number & 0x7f,
                    request.command() & 0x7f,
                ]);
            }
        }
        frame.extend_from_slice(&data);
        frame
    }
}

/// Replies are little-endian.
pub fn decode_u16(reply: [u8; 2]) -> u16 {
    u16::from_le_bytes(reply)
}

/// Bits of the Maestro error register, in bit order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumIter)]
pub enum MaestroErrorFlag {
    SerialSignal,
    SerialOverrun,
    SerialRxBufferFull,
    SerialCrc,
    SerialProtocol,
    SerialTimeout,
    ScriptStack,
    ScriptCallStack,
    ScriptProgramCounter,
}

impl MaestroErrorFlag {
    pub fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn decode(register: u16) -> Vec<MaestroErrorFlag> {
        MaestroErrorFlag::iter().filter(|flag| register & flag.bit() != 0).collect()
    }
}

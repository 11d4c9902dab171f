use std::future::Future;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::protocol::{decode_u16, Protocol, Request};
use crate::types::Channel;

/// The servo controller as seen by the rest of the crate.
///
/// Only the three setters are required. Queries default to
/// [`TransportError::Unsupported`].
pub trait ServoDevice {
    fn set_target(
        &mut self,
        channel: Channel,
        target: u16,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn set_speed(
        &mut self,
        channel: Channel,
        speed: u16,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn set_acceleration(
        &mut self,
        channel: Channel,
        acceleration: u8,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn get_position(
        &mut self,
        _channel: Channel,
    ) -> impl Future<Output = Result<u16, TransportError>> + Send {
        async { Err(TransportError::Unsupported) }
    }

    fn get_errors(&mut self) -> impl Future<Output = Result<u16, TransportError>> + Send {
        async { Err(TransportError::Unsupported) }
    }
}

/// A Maestro on a serial port (USB virtual COM or TTL UART).
pub struct SerialTransport {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    protocol: Protocol,
}

impl SerialTransport {
    pub fn open(
        path: &str,
        baud: u32,
        timeout: Duration,
        protocol: Protocol,
    ) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()?;
        info!("Opened {} at {} baud ({:?})", path, baud, protocol);
        Ok(SerialTransport {
            port: Arc::new(Mutex::new(port)),
            protocol,
        })
    }

    async fn send(&self, request: Request) -> Result<(), TransportError> {
        let port = Arc::clone(&self.port);
        let frame = self.protocol.encode(&request);
        debug!("-> {:02x?}", frame);

        tokio::task::spawn_blocking(move || port.lock().write_all(&frame)).await??;
        Ok(())
    }

    async fn query(&self, request: Request) -> Result<u16, TransportError> {
        let port = Arc::clone(&self.port);
        let frame = self.protocol.encode(&request);
        let expected_len = request.response_len();
        debug!("-> {:02x?}", frame);

        let buf = tokio::task::spawn_blocking(move || -> Result<[u8; 2], TransportError> {
            let mut port = port.lock();
            port.write_all(&frame)?;
            read_reply(&mut **port, expected_len)
        })
        .await??;

        debug!("<- {:02x?}", buf);
        Ok(decode_u16(buf))
    }
}

/// Reads a reply of `expected_len` bytes. A timeout or end of stream before
/// that is reported as `InvalidResponse` with whatever did arrive.
fn read_reply<R: Read + ?Sized>(
    reader: &mut R,
    expected_len: usize,
) -> Result<[u8; 2], TransportError> {
    let mut buf = [0u8; 2];
    let mut read = 0;
    while read < expected_len {
        match reader.read(&mut buf[read..expected_len]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
            Err(e) => return Err(e.into()),
        }
    }

    if read < expected_len {
        return Err(TransportError::InvalidResponse {
            expected_len,
            actual_len: read,
            raw_data: buf[..read].to_vec(),
        });
    }
    Ok(buf)
}

impl ServoDevice for SerialTransport {
    async fn set_target(&mut self, channel: Channel, target: u16) -> Result<(), TransportError> {
        self.send(Request::SetTarget { channel, target }).await
    }

    async fn set_speed(&mut self, channel: Channel, speed: u16) -> Result<(), TransportError> {
        self.send(Request::SetSpeed { channel, speed }).await
    }

    async fn set_acceleration(
        &mut self,
        channel: Channel,
        acceleration: u8,
    ) -> Result<(), TransportError> {
        self.send(Request::SetAcceleration {
            channel,
            acceleration,
        })
        .await
    }

    async fn get_position(&mut self, channel: Channel) -> Result<u16, TransportError> {
        self.query(Request::GetPosition { channel }).await
    }

    async fn get_errors(&mut self) -> Result<u16, TransportError> {
        self.query(Request::GetErrors).await
    }
}

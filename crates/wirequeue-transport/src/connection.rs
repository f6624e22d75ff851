//! A single accepted or dialed TCP connection, framed per [`wirequeue_proto::frame`].
//!
//! One type owns both the socket and the per-stream framing state, and
//! is blocking rather than poll-driven, since every session here owns a
//! dedicated worker thread rather than being multiplexed on one reactor
//! thread.

use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpStream},
    time::Duration,
};

use wirequeue_proto::{read_frame, write_frame, FrameCarry};

use crate::error::TransportError;

/// An established TCP connection plus the framing carry that must stay
/// attached to this specific stream (see spec §9's per-stream-carry note).
pub struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    carry: FrameCarry,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self { stream, peer_addr, carry: FrameCarry::new() }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        Ok(read_frame(&mut self.stream, &mut self.carry)?)
    }

    pub fn write_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        Ok(write_frame(&mut self.stream, payload)?)
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.stream.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Tries a non-blocking `try_clone` of the underlying socket so the
    /// caller can hand a second handle to, e.g., a watchdog without
    /// disturbing the framing carry (which stays with this instance).
    pub fn try_clone_stream(&self) -> Result<TcpStream, TransportError> {
        self.stream.try_clone().map_err(Into::into)
    }

    pub fn close(&mut self) -> Result<(), TransportError> {
        // Both directions; a half-close would leave a reader blocked on
        // the peer's side.
        match self.stream.shutdown(std::net::Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

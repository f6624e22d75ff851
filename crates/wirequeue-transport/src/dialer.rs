//! The client-side connecting endpoint (C3).

use std::{
    net::{TcpStream as StdTcpStream, ToSocketAddrs},
    time::Duration,
};

use tracing::debug;

use crate::{connection::Connection, error::TransportError};

/// Dials a single TCP connection. Stateless beyond the arguments passed to
/// [`Dialer::connect`] — the wirequeue client layer owns reconnect policy,
/// this type only owns the one blocking syscall.
pub struct Dialer;

impl Dialer {
    /// Resolves `host:port` and connects with `connect_timeout` bounding the
    /// TCP handshake only. Framing I/O on the returned [`Connection`] is
    /// unbounded by default; callers that need the application-level
    /// handshake (e.g. the HI greeting) bounded too set a read timeout on
    /// the connection themselves before exchanging those frames.
    pub fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<Connection, TransportError> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(TransportError::Io)?
            .next()
            .ok_or(TransportError::Unreachable)?;

        let stream = StdTcpStream::connect_timeout(&addr, connect_timeout).map_err(|e| match e.kind() {
            std::io::ErrorKind::TimedOut => TransportError::Timeout,
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound => TransportError::Unreachable,
            _ => TransportError::Io(e),
        })?;
        stream.set_nodelay(true).ok();
        debug!(%addr, "dialed connection");
        Ok(Connection::new(stream, addr))
    }
}

#[cfg(test)]
mod tests {
    use crate::listener::Listener;

    use super::*;

    #[test]
    fn connects_to_a_listening_peer() {
        let listener = Listener::bind("127.0.0.1", 0).unwrap();
        let port = listener.local_addr().port();

        let handle = std::thread::spawn(move || listener.accept().unwrap());
        let conn = Dialer::connect("127.0.0.1", port, Duration::from_secs(1)).unwrap();
        let (_server_side, _addr) = handle.join().unwrap();
        assert_eq!(conn.peer_addr().port(), port);
    }

    #[test]
    fn times_out_connecting_to_an_unroutable_address() {
        // TEST-NET-1, reserved for documentation: guaranteed not to route.
        let err = Dialer::connect("192.0.2.1", 12345, Duration::from_millis(200));
        assert!(matches!(err, Err(TransportError::Timeout) | Err(TransportError::Unreachable) | Err(TransportError::Io(_))));
    }
}

//! The server-side accept endpoint (C3).

use std::net::{SocketAddr, TcpListener as StdTcpListener, ToSocketAddrs};

use tracing::debug;

use crate::{connection::Connection, error::TransportError};

pub struct Listener {
    inner: StdTcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    pub fn bind(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(TransportError::Io)?
            .next()
            .ok_or(TransportError::Unreachable)?;

        let inner = StdTcpListener::bind(addr).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                TransportError::AddrInUse
            } else {
                TransportError::Io(e)
            }
        })?;
        let local_addr = inner.local_addr()?;
        debug!(%local_addr, "listener bound");
        Ok(Self { inner, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Blocks until a new connection arrives or the listener is closed.
    pub fn accept(&self) -> Result<(Connection, SocketAddr), TransportError> {
        let (stream, addr) = self.inner.accept().map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidInput {
                TransportError::Closed
            } else {
                TransportError::Io(e)
            }
        })?;
        stream.set_nodelay(true).ok();
        Ok((Connection::new(stream, addr), addr))
    }

    /// Unblocks any in-progress `accept` by connecting to ourselves and
    /// immediately dropping the connection; the accept loop's caller is
    /// expected to check a shutdown flag after `accept` returns.
    pub fn wake_accept_loop(&self) {
        if let Ok(stream) = std::net::TcpStream::connect(self.local_addr) {
            drop(stream);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_to_port_zero_picks_an_ephemeral_port() {
        let listener = Listener::bind("127.0.0.1", 0).unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[test]
    fn binding_the_same_port_twice_fails_with_addr_in_use() {
        let listener = Listener::bind("127.0.0.1", 0).unwrap();
        let port = listener.local_addr().port();
        let err = Listener::bind("127.0.0.1", port).unwrap_err();
        assert!(matches!(err, TransportError::AddrInUse));
    }
}

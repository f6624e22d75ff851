//! Server-side record of one connected client.
//!
//! A session is identified by an opaque `u64` rather than holding an
//! owning reference back to the server; the worker thread carries an
//! `Arc<ServerShared>` instead, so a session holds a non-owning handle
//! to the server rather than an owning cycle. The cloned [`TcpStream`]
//! handle lets [`crate::server::Server::close`] force-disconnect a
//! session from outside its worker thread without disturbing that
//! worker's framing carry, which stays on the original
//! [`wirequeue_transport::Connection`].

use std::net::{SocketAddr, TcpStream};

pub(crate) struct SessionInfo {
    pub remote_addr: SocketAddr,
    pub stream: TcpStream,
}

use thiserror::Error;

/// The client-side error taxonomy (spec §7), shared by [`crate::ClientCore`]
/// and [`crate::Pool`] so callers handling a pooled `Client` see the same
/// variants as a single-connection one.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientError {
    #[error("queue is at capacity")]
    Full,
    #[error("queue is empty")]
    Empty,
    #[error("not connected to the server")]
    Disconnected,
    #[error("authentication with the server failed")]
    AuthenticationFail,
    #[error("server has reached its client limit")]
    ClientsFull,
    #[error("could not reach the server")]
    Unreachable,
    #[error("another blocking call is already in flight on this connection")]
    ConcurrentUseRefused,
    #[error("connection pool is closed")]
    PoolClosed,
    #[error("connection pool is at capacity")]
    AtCapacity,
    #[error("timed out waiting for a pooled connection")]
    Timeout,
    #[error("malformed frame or unexpected reply")]
    ProtocolError,
    #[error("task_done called with no matching put outstanding")]
    InvalidState,
}

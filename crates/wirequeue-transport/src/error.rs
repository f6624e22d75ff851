use std::io;

use thiserror::Error;
use wirequeue_proto::ProtoError;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("io error")]
    Io(#[from] io::Error),

    #[error("address already in use")]
    AddrInUse,

    #[error("peer unreachable")]
    Unreachable,

    #[error("connect timed out")]
    Timeout,

    #[error("listener is closed")]
    Closed,

    #[error(transparent)]
    Proto(#[from] ProtoError),
}

use std::io;

use thiserror::Error;

/// Errors surfaced by the frame and envelope codecs.
///
/// `Io`/`PeerClosed` come from the byte-level frame layer; the rest come
/// from decoding a frame's payload into an [`crate::envelope::Envelope`] or
/// [`crate::item::Item`].
#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("io error reading/writing frame")]
    Io(#[from] io::Error),

    #[error("peer closed the connection")]
    PeerClosed,

    #[error("frame payload truncated, expected at least {needed} more byte(s)")]
    Truncated { needed: usize },

    #[error("unrecognised item tag {0}")]
    InvalidTag(u8),

    #[error("string payload is not valid utf8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("unknown command {0:?}")]
    UnknownCommand(Vec<u8>),
}

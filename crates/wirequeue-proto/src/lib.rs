//! Wire framing and envelope codec for the wirequeue protocol.
//!
//! Three layers, bottom to top:
//! - [`frame`]: delimiter-based byte framing over a stream (C1).
//! - [`item`] + [`envelope`]: the `{command, args, payload, error}`
//!   envelope and its tagged-union payload value type (C2).
//! - [`command`]: closed per-command request/response shapes built on
//!   top of the generic envelope.

pub mod command;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod item;

pub use command::{Command, Reply, HI};
pub use envelope::Envelope;
pub use error::ProtoError;
pub use frame::{read_frame, write_frame, FrameCarry, DELIMITER, DELIMITER_ESCAPE};
pub use item::Item;

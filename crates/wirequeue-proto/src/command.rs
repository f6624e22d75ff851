//! Closed, per-command request/response shapes layered on top of the
//! generic [`Envelope`]. The source system carries an open string-keyed
//! `args` map; this closes it into typed variants so a malformed or
//! missing argument is a decode-time error instead of a runtime
//! `KeyError` equivalent.

use std::time::Duration;

use crate::{envelope::Envelope, error::ProtoError, item::Item};

pub const HI: &[u8] = b"HI";
pub const CMD_AUTH_KEY: &[u8] = b"AUTH_KEY";
pub const CMD_PUT: &[u8] = b"PUT";
pub const CMD_GET: &[u8] = b"GET";
pub const CMD_STATUS: &[u8] = b"STATUS";
pub const CMD_PING: &[u8] = b"PING";
pub const CMD_SIZE: &[u8] = b"SIZE";
pub const CMD_MAXSIZE: &[u8] = b"MAXSIZE";
pub const CMD_RESET: &[u8] = b"RESET";
pub const CMD_CLIENTS: &[u8] = b"CLIENTS";
pub const CMD_TASK_DONE: &[u8] = b"TASK_DONE";
pub const CMD_JOIN: &[u8] = b"JOIN";

pub const REPLY_OK: &[u8] = b"OK";
pub const REPLY_FAIL: &[u8] = b"FAIL";
pub const REPLY_FULL: &[u8] = b"FULL";
pub const REPLY_EMPTY: &[u8] = b"EMPTY";
pub const REPLY_NORMAL: &[u8] = b"NORMAL";
pub const REPLY_PONG: &[u8] = b"PONG";
pub const REPLY_DATA: &[u8] = b"DATA";
pub const REPLY_NEED_AUTH: &[u8] = b"NEED_AUTH";

/// A client request, already validated into one of the closed shapes the
/// command table in the spec allows.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AuthKey { digest_hex: String },
    Put { block: bool, timeout: Option<Duration>, item: Item },
    Get { block: bool, timeout: Option<Duration> },
    Status,
    Ping,
    Size,
    MaxSize,
    Reset { max_size: Option<u64> },
    Clients,
    TaskDone,
    Join,
}

impl Command {
    pub fn to_envelope(&self) -> Envelope {
        match self {
            Command::AuthKey { digest_hex } => Envelope::new(
                CMD_AUTH_KEY,
                Item::Null,
                Item::Str(digest_hex.clone()),
                Item::Null,
            ),
            Command::Put { block, timeout, item } => {
                Envelope::new(CMD_PUT, block_timeout_args(*block, *timeout), item.clone(), Item::Null)
            }
            Command::Get { block, timeout } => Envelope::new(
                CMD_GET,
                block_timeout_args(*block, *timeout),
                Item::Null,
                Item::Null,
            ),
            Command::Status => Envelope::new(CMD_STATUS, Item::Null, Item::Null, Item::Null),
            Command::Ping => Envelope::new(CMD_PING, Item::Null, Item::Null, Item::Null),
            Command::Size => Envelope::new(CMD_SIZE, Item::Null, Item::Null, Item::Null),
            Command::MaxSize => Envelope::new(CMD_MAXSIZE, Item::Null, Item::Null, Item::Null),
            Command::Reset { max_size } => Envelope::new(
                CMD_RESET,
                Item::Map(vec![(
                    Item::Str("max_size".into()),
                    max_size.map_or(Item::Null, |m| Item::Int(m as i64)),
                )]),
                Item::Null,
                Item::Null,
            ),
            Command::Clients => Envelope::new(CMD_CLIENTS, Item::Null, Item::Null, Item::Null),
            Command::TaskDone => Envelope::new(CMD_TASK_DONE, Item::Null, Item::Null, Item::Null),
            Command::Join => Envelope::new(CMD_JOIN, Item::Null, Item::Null, Item::Null),
        }
    }

    pub fn from_envelope(env: &Envelope) -> Result<Self, ProtoError> {
        Ok(match env.command.as_slice() {
            c if c == CMD_AUTH_KEY => {
                let Item::Str(digest_hex) = &env.payload else {
                    return Err(ProtoError::MalformedEnvelope("AUTH_KEY payload must be a string".into()));
                };
                Command::AuthKey { digest_hex: digest_hex.clone() }
            }
            c if c == CMD_PUT => {
                let (block, timeout) = read_block_timeout(&env.args)?;
                Command::Put { block, timeout, item: env.payload.clone() }
            }
            c if c == CMD_GET => {
                let (block, timeout) = read_block_timeout(&env.args)?;
                Command::Get { block, timeout }
            }
            c if c == CMD_STATUS => Command::Status,
            c if c == CMD_PING => Command::Ping,
            c if c == CMD_SIZE => Command::Size,
            c if c == CMD_MAXSIZE => Command::MaxSize,
            c if c == CMD_RESET => {
                let max_size = match &env.args {
                    Item::Map(pairs) => pairs
                        .iter()
                        .find(|(k, _)| matches!(k, Item::Str(s) if s == "max_size"))
                        .map(|(_, v)| match v {
                            Item::Int(n) => Ok(Some(*n as u64)),
                            Item::Null => Ok(None),
                            _ => Err(ProtoError::MalformedEnvelope("max_size must be an int".into())),
                        })
                        .transpose()?
                        .flatten(),
                    _ => None,
                };
                Command::Reset { max_size }
            }
            c if c == CMD_CLIENTS => Command::Clients,
            c if c == CMD_TASK_DONE => Command::TaskDone,
            c if c == CMD_JOIN => Command::Join,
            other => return Err(ProtoError::UnknownCommand(other.to_vec())),
        })
    }
}

fn block_timeout_args(block: bool, timeout: Option<Duration>) -> Item {
    Item::Map(vec![
        (Item::Str("block".into()), Item::Bool(block)),
        (
            Item::Str("timeout".into()),
            timeout.map_or(Item::Null, |t| Item::Int(t.as_millis() as i64)),
        ),
    ])
}

fn read_block_timeout(args: &Item) -> Result<(bool, Option<Duration>), ProtoError> {
    let Item::Map(pairs) = args else {
        return Err(ProtoError::MalformedEnvelope("expected args map".into()));
    };
    let mut block = true;
    let mut timeout = None;
    for (k, v) in pairs {
        let Item::Str(key) = k else { continue };
        match (key.as_str(), v) {
            ("block", Item::Bool(b)) => block = *b,
            ("timeout", Item::Int(ms)) => timeout = Some(Duration::from_millis((*ms).max(0) as u64)),
            ("timeout", Item::Null) => timeout = None,
            _ => {}
        }
    }
    Ok((block, timeout))
}

/// A server reply, already validated into one of the closed shapes the
/// command table allows.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    Fail,
    Full,
    Empty,
    Normal,
    Pong,
    Data(Item),
    NeedAuth,
}

impl Reply {
    pub fn to_envelope(&self) -> Envelope {
        match self {
            Reply::Ok => Envelope::new(REPLY_OK, Item::Null, Item::Null, Item::Null),
            Reply::Fail => Envelope::new(REPLY_FAIL, Item::Null, Item::Null, Item::Null),
            Reply::Full => Envelope::new(REPLY_FULL, Item::Null, Item::Null, Item::Null),
            Reply::Empty => Envelope::new(REPLY_EMPTY, Item::Null, Item::Null, Item::Null),
            Reply::Normal => Envelope::new(REPLY_NORMAL, Item::Null, Item::Null, Item::Null),
            Reply::Pong => Envelope::new(REPLY_PONG, Item::Null, Item::Null, Item::Null),
            Reply::Data(item) => Envelope::new(REPLY_DATA, Item::Null, item.clone(), Item::Null),
            Reply::NeedAuth => Envelope::new(REPLY_NEED_AUTH, Item::Null, Item::Null, Item::Null),
        }
    }

    pub fn from_envelope(env: &Envelope) -> Result<Self, ProtoError> {
        Ok(match env.command.as_slice() {
            c if c == REPLY_OK => Reply::Ok,
            c if c == REPLY_FAIL => Reply::Fail,
            c if c == REPLY_FULL => Reply::Full,
            c if c == REPLY_EMPTY => Reply::Empty,
            c if c == REPLY_NORMAL => Reply::Normal,
            c if c == REPLY_PONG => Reply::Pong,
            c if c == REPLY_DATA => Reply::Data(env.payload.clone()),
            c if c == REPLY_NEED_AUTH => Reply::NeedAuth,
            other => return Err(ProtoError::UnknownCommand(other.to_vec())),
        })
    }
}

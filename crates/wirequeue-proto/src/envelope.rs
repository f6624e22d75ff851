//! The structured {command, args, payload, error} record carried inside a
//! single frame. `args`/`payload`/`error` are each an [`Item`]; `command`
//! is the literal ASCII command name (`PUT`, `GET`, ...) so a wire
//! capture reads as the command table directly.

use crate::{error::ProtoError, item::Item};

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub command: Vec<u8>,
    pub args: Item,
    pub payload: Item,
    pub error: Item,
}

impl Envelope {
    pub fn new(command: &'static [u8], args: Item, payload: Item, error: Item) -> Self {
        Self { command: command.to_vec(), args, payload, error }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.command.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.command);
        self.args.encode_into(&mut out);
        self.payload.encode_into(&mut out);
        self.error.encode_into(&mut out);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtoError> {
        if data.len() < 4 {
            return Err(ProtoError::Truncated { needed: 4 - data.len() });
        }
        let cmd_len = u32::from_le_bytes(data[..4].try_into().expect("checked above")) as usize;
        let mut pos = 4;
        if data.len() < pos + cmd_len {
            return Err(ProtoError::Truncated { needed: pos + cmd_len - data.len() });
        }
        let command = data[pos..pos + cmd_len].to_vec();
        pos += cmd_len;

        let (args, consumed) = Item::decode(&data[pos..])?;
        pos += consumed;
        let (payload, consumed) = Item::decode(&data[pos..])?;
        pos += consumed;
        let (error, consumed) = Item::decode(&data[pos..])?;
        pos += consumed;

        if pos != data.len() {
            return Err(ProtoError::MalformedEnvelope(format!(
                "{} trailing byte(s) after envelope",
                data.len() - pos
            )));
        }

        Ok(Envelope { command, args, payload, error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_with_all_fields_populated() {
        let env = Envelope::new(
            b"PUT",
            Item::Map(vec![
                (Item::Str("block".into()), Item::Bool(true)),
                (Item::Str("timeout".into()), Item::Null),
            ]),
            Item::Str("payload".into()),
            Item::Null,
        );
        let bytes = env.encode();
        assert_eq!(Envelope::decode(&bytes).unwrap(), env);
    }

    #[test]
    fn roundtrips_with_empty_command() {
        let env = Envelope::new(b"", Item::Null, Item::Null, Item::Null);
        let bytes = env.encode();
        assert_eq!(Envelope::decode(&bytes).unwrap(), env);
    }

    #[test]
    fn rejects_trailing_garbage() {
        let env = Envelope::new(b"PING", Item::Null, Item::Null, Item::Null);
        let mut bytes = env.encode();
        bytes.push(0xFF);
        assert!(Envelope::decode(&bytes).is_err());
    }
}

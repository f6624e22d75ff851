//! The queue's payload value type and its tagged binary encoding.
//!
//! `Item` is a closed sum over the value kinds the queue must carry
//! losslessly between processes. Each kind is tagged with a single byte
//! so the decoder never has to guess;
//! containers are encoded recursively and are therefore self-delimiting —
//! no outer length prefix is needed to know where one `Item` ends.

use crate::error::ProtoError;

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(f64, f64),
    Bytes(Vec<u8>),
    Str(String),
    List(Vec<Item>),
    Tuple(Vec<Item>),
    /// Insertion-ordered key/value pairs. `Vec` rather than `HashMap`
    /// because `Item` contains `f64` and is not generally hashable.
    Map(Vec<(Item, Item)>),
    /// Insertion-ordered, deduplication is the producer's responsibility —
    /// the codec only guarantees round-tripping whatever was handed to it.
    Set(Vec<Item>),
}

#[repr(u8)]
enum Tag {
    Null = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    Complex = 4,
    Bytes = 5,
    Str = 6,
    List = 7,
    Tuple = 8,
    Map = 9,
    Set = 10,
}

impl Item {
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Item::Null => out.push(Tag::Null as u8),
            Item::Bool(b) => {
                out.push(Tag::Bool as u8);
                out.push(*b as u8);
            }
            Item::Int(i) => {
                out.push(Tag::Int as u8);
                out.extend_from_slice(&i.to_le_bytes());
            }
            Item::Float(f) => {
                out.push(Tag::Float as u8);
                out.extend_from_slice(&f.to_le_bytes());
            }
            Item::Complex(re, im) => {
                out.push(Tag::Complex as u8);
                out.extend_from_slice(&re.to_le_bytes());
                out.extend_from_slice(&im.to_le_bytes());
            }
            Item::Bytes(bytes) => {
                out.push(Tag::Bytes as u8);
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(bytes);
            }
            Item::Str(s) => {
                out.push(Tag::Str as u8);
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Item::List(items) => encode_seq(Tag::List, items, out),
            Item::Tuple(items) => encode_seq(Tag::Tuple, items, out),
            Item::Set(items) => encode_seq(Tag::Set, items, out),
            Item::Map(pairs) => {
                out.push(Tag::Map as u8);
                out.extend_from_slice(&(pairs.len() as u32).to_le_bytes());
                for (k, v) in pairs {
                    k.encode_into(out);
                    v.encode_into(out);
                }
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    /// Decodes one `Item` from the front of `data`, returning it together
    /// with the number of bytes consumed so callers can decode a sequence
    /// of items back to back without an outer length prefix.
    pub fn decode(data: &[u8]) -> Result<(Item, usize), ProtoError> {
        let mut cur = Cursor { data, pos: 0 };
        let item = cur.read_item()?;
        Ok((item, cur.pos))
    }
}

fn encode_seq(tag: Tag, items: &[Item], out: &mut Vec<u8>) {
    out.push(tag as u8);
    out.extend_from_slice(&(items.len() as u32).to_le_bytes());
    for item in items {
        item.encode_into(out);
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn need(&self, n: usize) -> Result<(), ProtoError> {
        if self.data.len() - self.pos < n {
            Err(ProtoError::Truncated { needed: n - (self.data.len() - self.pos) })
        } else {
            Ok(())
        }
    }

    fn read_u8(&mut self) -> Result<u8, ProtoError> {
        self.need(1)?;
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtoError> {
        self.need(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, ProtoError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("checked above")))
    }

    fn read_i64(&mut self) -> Result<i64, ProtoError> {
        let bytes = self.read_bytes(8)?;
        Ok(i64::from_le_bytes(bytes.try_into().expect("checked above")))
    }

    fn read_f64(&mut self) -> Result<f64, ProtoError> {
        let bytes = self.read_bytes(8)?;
        Ok(f64::from_le_bytes(bytes.try_into().expect("checked above")))
    }

    fn read_item(&mut self) -> Result<Item, ProtoError> {
        let tag = self.read_u8()?;
        Ok(match tag {
            0 => Item::Null,
            1 => Item::Bool(self.read_u8()? != 0),
            2 => Item::Int(self.read_i64()?),
            3 => Item::Float(self.read_f64()?),
            4 => Item::Complex(self.read_f64()?, self.read_f64()?),
            5 => {
                let len = self.read_u32()? as usize;
                Item::Bytes(self.read_bytes(len)?.to_vec())
            }
            6 => {
                let len = self.read_u32()? as usize;
                let bytes = self.read_bytes(len)?.to_vec();
                Item::Str(String::from_utf8(bytes)?)
            }
            7 => Item::List(self.read_seq()?),
            8 => Item::Tuple(self.read_seq()?),
            10 => Item::Set(self.read_seq()?),
            9 => {
                let len = self.read_u32()? as usize;
                let mut pairs = Vec::with_capacity(len);
                for _ in 0..len {
                    let k = self.read_item()?;
                    let v = self.read_item()?;
                    pairs.push((k, v));
                }
                Item::Map(pairs)
            }
            other => return Err(ProtoError::InvalidTag(other)),
        })
    }

    fn read_seq(&mut self) -> Result<Vec<Item>, ProtoError> {
        let len = self.read_u32()? as usize;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.read_item()?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(item: &Item) -> Item {
        let bytes = item.encode();
        let (decoded, consumed) = Item::decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        decoded
    }

    #[test]
    fn every_kind_roundtrips() {
        let samples = vec![
            Item::Bytes(b"123".to_vec()),
            Item::Str("123".into()),
            Item::Int(123),
            Item::Int(-123),
            Item::Complex(123.0, -1.0),
            Item::Float(123.01),
            Item::Bool(false),
            Item::List(vec![Item::Bool(true), Item::Bool(false), Item::Int(123)]),
            Item::Tuple(vec![Item::Bool(true), Item::Bool(false), Item::Int(123)]),
            Item::Map(vec![
                (Item::Str("1".into()), Item::Int(123)),
                (Item::Str("2".into()), Item::Bool(true)),
                (
                    Item::Str("3".into()),
                    Item::List(vec![Item::Int(1), Item::Int(2), Item::Int(3)]),
                ),
            ]),
            Item::Set(vec![Item::Int(1), Item::Int(2), Item::Int(3)]),
            Item::Null,
        ];

        for sample in &samples {
            assert_eq!(&roundtrip(sample), sample);
        }
    }

    #[test]
    fn nested_containers_roundtrip() {
        let item = Item::List(vec![
            Item::Map(vec![(Item::Str("k".into()), Item::Tuple(vec![Item::Null, Item::Bool(true)]))]),
            Item::Set(vec![Item::Bytes(vec![1, 2, 3])]),
        ]);
        assert_eq!(roundtrip(&item), item);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let item = Item::Str("hello".into());
        let mut bytes = item.encode();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(Item::decode(&bytes), Err(ProtoError::Truncated { .. })));
    }

    #[test]
    fn invalid_tag_is_an_error() {
        assert!(matches!(Item::decode(&[255]), Err(ProtoError::InvalidTag(255))));
    }
}

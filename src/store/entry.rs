use crate::error::{StoreError, StoreResult};
use crate::types::sorted_set::SortedSet;
use crate::types::Value;
use std::collections::{HashMap, HashSet, VecDeque};

const TAG_STRING: u8 = 0;
const TAG_HASH: u8 = 1;
const TAG_LIST: u8 = 2;
const TAG_SET: u8 = 3;
const TAG_SORTED_SET: u8 = 4;

/// One record in a database: a key and its tagged value.
///
/// Binary layout (little-endian, u64 sizes):
/// `tag:u8  key_len:u64  key  body`, where the body runs to the end of the
/// frame supplied by the enclosing container (skip list or AOF record).
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: Value,
}

impl Entry {
    pub fn new(key: String, value: Value) -> Self {
        Entry { key, value }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + 8 + self.key.len());
        buf.push(self.tag());
        write_frame(&mut buf, self.key.as_bytes());

        match &self.value {
            Value::String(s) => buf.extend_from_slice(s),
            Value::Hash(hash) => {
                for (field, value) in hash {
                    write_frame(&mut buf, field.as_bytes());
                    write_frame(&mut buf, value.as_bytes());
                }
            }
            Value::List(list) => {
                for element in list {
                    write_frame(&mut buf, element.as_bytes());
                }
            }
            Value::Set(set) => {
                for member in set {
                    write_frame(&mut buf, member.as_bytes());
                }
            }
            Value::SortedSet(zset) => {
                for (member, score) in zset.iter() {
                    buf.extend_from_slice(&((member.len() + 8) as u64).to_le_bytes());
                    buf.extend_from_slice(member.as_bytes());
                    buf.extend_from_slice(&score.to_le_bytes());
                }
            }
        }

        buf
    }

    /// Parse one entry from an exact frame. Fails with `Malformed` on
    /// truncation or an unknown tag.
    pub fn from_bytes(buf: &[u8]) -> StoreResult<Entry> {
        let mut cursor = Cursor { buf };
        let tag = cursor.u8()?;
        let key = cursor.string()?;

        let value = match tag {
            TAG_STRING => Value::String(cursor.rest().to_vec()),
            TAG_HASH => {
                let mut hash = HashMap::new();
                while !cursor.is_empty() {
                    let field = cursor.string()?;
                    let value = cursor.string()?;
                    hash.insert(field, value);
                }
                Value::Hash(hash)
            }
            TAG_LIST => {
                let mut list = VecDeque::new();
                while !cursor.is_empty() {
                    list.push_back(cursor.string()?);
                }
                Value::List(list)
            }
            TAG_SET => {
                let mut set = HashSet::new();
                while !cursor.is_empty() {
                    set.insert(cursor.string()?);
                }
                Value::Set(set)
            }
            TAG_SORTED_SET => {
                let mut zset = SortedSet::new();
                while !cursor.is_empty() {
                    let len = cursor.u64()? as usize;
                    let member_len = len
                        .checked_sub(8)
                        .ok_or(StoreError::Malformed("sorted set element too short"))?;
                    let member = string_from(cursor.bytes(member_len)?)?;
                    let score = f64::from_le_bytes(
                        cursor
                            .bytes(8)?
                            .try_into()
                            .expect("slice is exactly 8 bytes"),
                    );
                    zset.add(member, score);
                }
                Value::SortedSet(zset)
            }
            _ => return Err(StoreError::Malformed("unknown entry tag")),
        };

        Ok(Entry { key, value })
    }

    fn tag(&self) -> u8 {
        match self.value {
            Value::String(_) => TAG_STRING,
            Value::Hash(_) => TAG_HASH,
            Value::List(_) => TAG_LIST,
            Value::Set(_) => TAG_SET,
            Value::SortedSet(_) => TAG_SORTED_SET,
        }
    }
}

fn write_frame(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn string_from(bytes: &[u8]) -> StoreResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| StoreError::Malformed("invalid utf-8"))
}

/// Checked reader over a byte frame.
struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn rest(&self) -> &'a [u8] {
        self.buf
    }

    fn bytes(&mut self, n: usize) -> StoreResult<&'a [u8]> {
        if self.buf.len() < n {
            return Err(StoreError::Malformed("truncated frame"));
        }
        let (taken, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(taken)
    }

    fn u8(&mut self) -> StoreResult<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u64(&mut self) -> StoreResult<u64> {
        Ok(u64::from_le_bytes(
            self.bytes(8)?.try_into().expect("slice is exactly 8 bytes"),
        ))
    }

    fn string(&mut self) -> StoreResult<String> {
        let len = self.u64()? as usize;
        string_from(self.bytes(len)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(entry: &Entry) -> Entry {
        Entry::from_bytes(&entry.serialize()).unwrap()
    }

    #[test]
    fn test_string_round_trip() {
        let entry = Entry::new("foo".to_string(), Value::String(b"bar baz".to_vec()));
        assert_eq!(round_trip(&entry), entry);
    }

    #[test]
    fn test_binary_string_round_trip() {
        let entry = Entry::new("bits".to_string(), Value::String(vec![0, 159, 146, 0xff]));
        assert_eq!(round_trip(&entry), entry);
    }

    #[test]
    fn test_empty_string_round_trip() {
        let entry = Entry::new("empty".to_string(), Value::String(Vec::new()));
        assert_eq!(round_trip(&entry), entry);
    }

    #[test]
    fn test_hash_round_trip() {
        let hash: HashMap<String, String> = [("f1", "v1"), ("f2", "v2"), ("f3", "")]
            .iter()
            .map(|(f, v)| (f.to_string(), v.to_string()))
            .collect();
        let entry = Entry::new("h".to_string(), Value::Hash(hash));
        assert_eq!(round_trip(&entry), entry);
    }

    #[test]
    fn test_list_round_trip_preserves_order() {
        let list: VecDeque<String> = ["c", "a", "b", "a"].iter().map(|s| s.to_string()).collect();
        let entry = Entry::new("l".to_string(), Value::List(list));
        assert_eq!(round_trip(&entry), entry);
    }

    #[test]
    fn test_set_round_trip() {
        let set: HashSet<String> = ["x", "y", "z"].iter().map(|s| s.to_string()).collect();
        let entry = Entry::new("s".to_string(), Value::Set(set));
        assert_eq!(round_trip(&entry), entry);
    }

    #[test]
    fn test_sorted_set_round_trip() {
        let zset: SortedSet = [("a".to_string(), 2.5), ("b".to_string(), -1.0)]
            .into_iter()
            .collect();
        let entry = Entry::new("z".to_string(), Value::SortedSet(zset));
        let parsed = round_trip(&entry);
        assert_eq!(parsed, entry);

        let Value::SortedSet(z) = parsed.value else {
            panic!("expected sorted set");
        };
        let members: Vec<&str> = z.iter().map(|(m, _)| m).collect();
        assert_eq!(members, vec!["b", "a"]);
    }

    #[test]
    fn test_unknown_tag() {
        let mut buf = Entry::new("k".to_string(), Value::String(b"v".to_vec())).serialize();
        buf[0] = 9;
        assert!(matches!(
            Entry::from_bytes(&buf),
            Err(StoreError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_frames() {
        let buf = Entry::new("key".to_string(), Value::String(b"value".to_vec())).serialize();
        // Every proper prefix that cuts the key frame must fail.
        for len in 0..9 + 3 {
            assert!(
                Entry::from_bytes(&buf[..len]).is_err(),
                "prefix of {len} bytes parsed"
            );
        }
    }

    #[test]
    fn test_truncated_hash_field() {
        let hash: HashMap<String, String> =
            [("field".to_string(), "value".to_string())].into_iter().collect();
        let buf = Entry::new("h".to_string(), Value::Hash(hash)).serialize();
        assert!(Entry::from_bytes(&buf[..buf.len() - 1]).is_err());
    }
}

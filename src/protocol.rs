use crate::error::{StoreError, StoreResult};

/// Inbound request envelope — the complete statement as the user typed it.
/// The wire form is the raw statement bytes; the dispatcher splits off the
/// command word at the first space.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    statement: String,
}

impl Answer {
    pub fn new(statement: impl Into<String>) -> Self {
        Answer {
            statement: statement.into(),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        Answer {
            statement: String::from_utf8_lossy(data).into_owned(),
        }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.statement.as_bytes().to_vec()
    }
}

const TAG_NIL: u8 = 0;
const TAG_INTEGER: u8 = 1;
const TAG_ERROR: u8 = 2;
const TAG_STATUS: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_ARRAY: u8 = 5;

/// Outbound response envelope.
///
/// Wire layout (little-endian):
/// `db_index:u64  tx:u8  tag:u8  body`, where the body is empty for nil, an
/// i64 for integers, raw bytes for error/status/string, and a sequence of
/// `u64 length ∥ reply` frames for arrays. The top-level body extent is
/// implied by the transport frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub db_index: u64,
    pub in_transaction: bool,
    pub value: ReplyValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyValue {
    Nil,
    Integer(i64),
    Error(String),
    Status(String),
    String(Vec<u8>),
    Array(Vec<Reply>),
}

impl ReplyValue {
    pub fn ok() -> Self {
        ReplyValue::Status("OK".to_string())
    }

    pub fn queued() -> Self {
        ReplyValue::Status("QUEUED".to_string())
    }

    pub fn status(s: impl Into<String>) -> Self {
        ReplyValue::Status(s.into())
    }

    pub fn error(e: impl std::fmt::Display) -> Self {
        ReplyValue::Error(e.to_string())
    }

    pub fn string(data: impl Into<Vec<u8>>) -> Self {
        ReplyValue::String(data.into())
    }
}

impl Reply {
    pub fn new(value: ReplyValue) -> Self {
        Reply {
            db_index: 0,
            in_transaction: false,
            value,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.db_index.to_le_bytes());
        buf.push(self.in_transaction as u8);

        match &self.value {
            ReplyValue::Nil => buf.push(TAG_NIL),
            ReplyValue::Integer(n) => {
                buf.push(TAG_INTEGER);
                buf.extend_from_slice(&n.to_le_bytes());
            }
            ReplyValue::Error(s) => {
                buf.push(TAG_ERROR);
                buf.extend_from_slice(s.as_bytes());
            }
            ReplyValue::Status(s) => {
                buf.push(TAG_STATUS);
                buf.extend_from_slice(s.as_bytes());
            }
            ReplyValue::String(data) => {
                buf.push(TAG_STRING);
                buf.extend_from_slice(data);
            }
            ReplyValue::Array(replies) => {
                buf.push(TAG_ARRAY);
                for reply in replies {
                    let bytes = reply.serialize();
                    buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
                    buf.extend_from_slice(&bytes);
                }
            }
        }
    }

    /// Parse one reply from an exact frame (client and test side).
    pub fn from_bytes(buf: &[u8]) -> StoreResult<Reply> {
        if buf.len() < 10 {
            return Err(StoreError::Malformed("truncated reply header"));
        }
        let db_index = u64::from_le_bytes(buf[..8].try_into().expect("slice is exactly 8 bytes"));
        let in_transaction = buf[8] != 0;
        let tag = buf[9];
        let body = &buf[10..];

        let value = match tag {
            TAG_NIL => ReplyValue::Nil,
            TAG_INTEGER => {
                if body.len() < 8 {
                    return Err(StoreError::Malformed("truncated integer reply"));
                }
                ReplyValue::Integer(i64::from_le_bytes(
                    body[..8].try_into().expect("slice is exactly 8 bytes"),
                ))
            }
            TAG_ERROR => ReplyValue::Error(String::from_utf8_lossy(body).into_owned()),
            TAG_STATUS => ReplyValue::Status(String::from_utf8_lossy(body).into_owned()),
            TAG_STRING => ReplyValue::String(body.to_vec()),
            TAG_ARRAY => {
                let mut replies = Vec::new();
                let mut rest = body;
                while !rest.is_empty() {
                    if rest.len() < 8 {
                        return Err(StoreError::Malformed("truncated array frame"));
                    }
                    let len = u64::from_le_bytes(
                        rest[..8].try_into().expect("slice is exactly 8 bytes"),
                    ) as usize;
                    rest = &rest[8..];
                    if rest.len() < len {
                        return Err(StoreError::Malformed("truncated array frame"));
                    }
                    replies.push(Reply::from_bytes(&rest[..len])?);
                    rest = &rest[len..];
                }
                ReplyValue::Array(replies)
            }
            _ => return Err(StoreError::Malformed("unknown reply tag")),
        };

        Ok(Reply {
            db_index,
            in_transaction,
            value,
        })
    }
}

use crate::command::{parse_int, split_first, wrong_args};
use crate::error::StoreError;
use crate::protocol::{Reply, ReplyValue};
use crate::store::{Database, Entry};
use crate::types::Value;

pub fn set(db: &Database, statement: &str) -> ReplyValue {
    let (key, value) = split_first(statement);
    if key.is_empty() || !statement.contains(' ') {
        return wrong_args("set");
    }

    db.write().insert(Entry::new(
        key.to_string(),
        Value::String(value.as_bytes().to_vec()),
    ));
    ReplyValue::ok()
}

pub fn get(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("get");
    }

    let list = db.read();
    match list.find(statement) {
        Some(entry) => match entry.value.as_string() {
            Ok(s) => ReplyValue::string(s.clone()),
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Nil,
    }
}

pub fn get_range(db: &Database, statement: &str) -> ReplyValue {
    let (key, rest) = split_first(statement);
    let (start, end) = split_first(rest);
    if key.is_empty() || start.is_empty() || end.is_empty() {
        return wrong_args("getrange");
    }
    let (start, end) = match (parse_int(start), parse_int(end)) {
        (Ok(s), Ok(e)) => (s, e),
        _ => return ReplyValue::error(StoreError::NotInteger),
    };

    let list = db.read();
    let Some(entry) = list.find(key) else {
        return ReplyValue::string(Vec::new());
    };
    let value = match entry.value.as_string() {
        Ok(s) => s,
        Err(e) => return ReplyValue::error(e),
    };

    // Python-style inclusive range: negative indexes count from the end,
    // both ends clamped to the value.
    let len = value.len() as i64;
    let start = if start < 0 { len + start } else { start }.max(0);
    let end = (if end < 0 { len + end } else { end } + 1).min(len);

    if start < len && end > 0 && start < end {
        ReplyValue::string(value[start as usize..end as usize].to_vec())
    } else {
        ReplyValue::string(Vec::new())
    }
}

pub fn get_bit(db: &Database, statement: &str) -> ReplyValue {
    let (key, offset) = split_first(statement);
    if key.is_empty() || offset.is_empty() {
        return wrong_args("getbit");
    }
    let offset = match parse_int(offset) {
        Ok(n) if n >= 0 => n as usize,
        _ => return ReplyValue::error(StoreError::NotInteger),
    };

    let list = db.read();
    let Some(entry) = list.find(key) else {
        return ReplyValue::Integer(0);
    };
    match entry.value.as_string() {
        Ok(s) => {
            let index = offset / 8;
            let bit = if index < s.len() {
                s[index] >> (offset % 8) & 1
            } else {
                0
            };
            ReplyValue::Integer(bit as i64)
        }
        Err(e) => ReplyValue::error(e),
    }
}

pub fn set_bit(db: &Database, statement: &str) -> ReplyValue {
    let (key, rest) = split_first(statement);
    let (offset, value) = split_first(rest);
    if key.is_empty() || offset.is_empty() || value.is_empty() {
        return wrong_args("setbit");
    }
    let offset = match parse_int(offset) {
        Ok(n) if n >= 0 => n as usize,
        _ => return ReplyValue::error(StoreError::NotInteger),
    };
    let index = offset / 8;
    let position = (offset % 8) as u8;
    let set = value == "1";

    let mut list = db.write();
    match list.find_mut(key) {
        Some(entry) => match entry.value.as_string_mut() {
            Ok(s) => {
                if index >= s.len() {
                    s.resize(index + 1, 0);
                }
                let old = s[index] >> position & 1;
                if set {
                    s[index] |= 1 << position;
                } else {
                    s[index] &= !(1 << position);
                }
                ReplyValue::Integer(old as i64)
            }
            Err(e) => ReplyValue::error(e),
        },
        None => {
            let mut bytes = vec![0u8; index + 1];
            if set {
                bytes[index] |= 1 << position;
            }
            list.insert(Entry::new(key.to_string(), Value::String(bytes)));
            ReplyValue::Integer(0)
        }
    }
}

pub fn mget(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("mget");
    }

    let list = db.read();
    let replies = statement
        .split(' ')
        .map(|key| {
            let value = match list.find(key) {
                Some(entry) => match entry.value.as_string() {
                    Ok(s) => ReplyValue::string(s.clone()),
                    Err(_) => ReplyValue::Nil,
                },
                None => ReplyValue::Nil,
            };
            Reply::new(value)
        })
        .collect();
    ReplyValue::Array(replies)
}

pub fn set_nx(db: &Database, statement: &str) -> ReplyValue {
    let (key, value) = split_first(statement);
    if key.is_empty() || !statement.contains(' ') {
        return wrong_args("setnx");
    }

    let mut list = db.write();
    if list.contains(key) {
        ReplyValue::Integer(0)
    } else {
        list.insert(Entry::new(
            key.to_string(),
            Value::String(value.as_bytes().to_vec()),
        ));
        ReplyValue::Integer(1)
    }
}

pub fn set_range(db: &Database, statement: &str) -> ReplyValue {
    let (key, rest) = split_first(statement);
    let (offset, value) = split_first(rest);
    if key.is_empty() || offset.is_empty() || !rest.contains(' ') {
        return wrong_args("setrange");
    }
    let offset = match parse_int(offset) {
        Ok(n) if n >= 0 => n as usize,
        _ => return ReplyValue::error(StoreError::NotInteger),
    };
    let end = offset + value.len();

    let mut list = db.write();
    match list.find_mut(key) {
        Some(entry) => match entry.value.as_string_mut() {
            Ok(s) => {
                // Pad with NUL up to the offset, grow as needed.
                if s.len() < end {
                    s.resize(end, 0);
                }
                s[offset..end].copy_from_slice(value.as_bytes());
                ReplyValue::Integer(s.len() as i64)
            }
            Err(e) => ReplyValue::error(e),
        },
        None => {
            let mut bytes = vec![0u8; offset];
            bytes.extend_from_slice(value.as_bytes());
            list.insert(Entry::new(key.to_string(), Value::String(bytes)));
            ReplyValue::Integer(end as i64)
        }
    }
}

pub fn strlen(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("strlen");
    }

    let list = db.read();
    match list.find(statement) {
        Some(entry) => match entry.value.as_string() {
            Ok(s) => ReplyValue::Integer(s.len() as i64),
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Integer(0),
    }
}

pub fn mset(db: &Database, statement: &str) -> ReplyValue {
    let Some(pairs) = key_value_pairs(statement) else {
        return wrong_args("mset");
    };

    let mut list = db.write();
    for (key, value) in pairs {
        list.insert(Entry::new(
            key.to_string(),
            Value::String(value.as_bytes().to_vec()),
        ));
    }
    ReplyValue::ok()
}

pub fn mset_nx(db: &Database, statement: &str) -> ReplyValue {
    let Some(pairs) = key_value_pairs(statement) else {
        return wrong_args("msetnx");
    };

    // All-or-nothing: apply only when every key is currently absent.
    let mut list = db.write();
    if pairs.iter().any(|(key, _)| list.contains(key)) {
        return ReplyValue::Integer(0);
    }

    let count = pairs.len();
    for (key, value) in pairs {
        list.insert(Entry::new(
            key.to_string(),
            Value::String(value.as_bytes().to_vec()),
        ));
    }
    ReplyValue::Integer(count as i64)
}

pub fn incr(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("incr");
    }
    crement(db, statement, 1, true)
}

pub fn incr_by(db: &Database, statement: &str) -> ReplyValue {
    let (key, delta) = split_first(statement);
    if key.is_empty() || delta.is_empty() {
        return wrong_args("incrby");
    }
    match parse_int(delta) {
        Ok(delta) => crement(db, key, delta, true),
        Err(e) => ReplyValue::error(e),
    }
}

pub fn decr(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("decr");
    }
    crement(db, statement, 1, false)
}

pub fn decr_by(db: &Database, statement: &str) -> ReplyValue {
    let (key, delta) = split_first(statement);
    if key.is_empty() || delta.is_empty() {
        return wrong_args("decrby");
    }
    match parse_int(delta) {
        Ok(delta) => crement(db, key, delta, false),
        Err(e) => ReplyValue::error(e),
    }
}

pub fn append(db: &Database, statement: &str) -> ReplyValue {
    let (key, value) = split_first(statement);
    if key.is_empty() || !statement.contains(' ') {
        return wrong_args("append");
    }

    let mut list = db.write();
    match list.find_mut(key) {
        Some(entry) => match entry.value.as_string_mut() {
            Ok(s) => {
                s.extend_from_slice(value.as_bytes());
                ReplyValue::Integer(s.len() as i64)
            }
            Err(e) => ReplyValue::error(e),
        },
        None => {
            let len = value.len();
            list.insert(Entry::new(
                key.to_string(),
                Value::String(value.as_bytes().to_vec()),
            ));
            ReplyValue::Integer(len as i64)
        }
    }
}

/// Shared INCR/DECR body: the stored value must parse as a signed 64-bit
/// decimal; a missing key starts from zero.
fn crement(db: &Database, key: &str, delta: i64, plus: bool) -> ReplyValue {
    let mut list = db.write();
    match list.find_mut(key) {
        Some(entry) => match entry.value.as_string_mut() {
            Ok(s) => {
                let current = match std::str::from_utf8(s).ok().and_then(|t| t.parse::<i64>().ok())
                {
                    Some(n) => n,
                    None => return ReplyValue::error(StoreError::NotInteger),
                };
                let next = if plus {
                    current.checked_add(delta)
                } else {
                    current.checked_sub(delta)
                };
                let Some(next) = next else {
                    return ReplyValue::error(StoreError::NotInteger);
                };
                *s = next.to_string().into_bytes();
                ReplyValue::Integer(next)
            }
            Err(e) => ReplyValue::error(e),
        },
        None => {
            let start = if plus { delta } else { 0i64.wrapping_sub(delta) };
            list.insert(Entry::new(
                key.to_string(),
                Value::String(start.to_string().into_bytes()),
            ));
            ReplyValue::Integer(start)
        }
    }
}

/// Tokenize an alternating `key value key value …` statement.
fn key_value_pairs(statement: &str) -> Option<Vec<(&str, &str)>> {
    if statement.is_empty() {
        return None;
    }
    let tokens: Vec<&str> = statement.split(' ').collect();
    if tokens.len() % 2 != 0 {
        return None;
    }
    Some(tokens.chunks(2).map(|pair| (pair[0], pair[1])).collect())
}

use crate::command::{parse_int, split_first, wrong_args};
use crate::error::StoreError;
use crate::protocol::{Reply, ReplyValue};
use crate::store::{Database, Entry};
use crate::types::Value;
use std::collections::HashMap;

pub fn hdel(db: &Database, statement: &str) -> ReplyValue {
    let (key, fields) = split_first(statement);
    if key.is_empty() || fields.is_empty() {
        return wrong_args("hdel");
    }

    let mut list = db.write();
    match list.find_mut(key) {
        Some(entry) => match entry.value.as_hash_mut() {
            Ok(hash) => {
                let count = fields.split(' ').filter(|f| hash.remove(*f).is_some()).count();
                ReplyValue::Integer(count as i64)
            }
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Integer(0),
    }
}

pub fn hexists(db: &Database, statement: &str) -> ReplyValue {
    let (key, field) = split_first(statement);
    if key.is_empty() || field.is_empty() {
        return wrong_args("hexists");
    }

    let list = db.read();
    match list.find(key) {
        Some(entry) => match entry.value.as_hash() {
            Ok(hash) => ReplyValue::Integer(hash.contains_key(field) as i64),
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Integer(0),
    }
}

pub fn hget(db: &Database, statement: &str) -> ReplyValue {
    let (key, field) = split_first(statement);
    if key.is_empty() || field.is_empty() {
        return wrong_args("hget");
    }

    let list = db.read();
    match list.find(key) {
        Some(entry) => match entry.value.as_hash() {
            Ok(hash) => match hash.get(field) {
                Some(value) => ReplyValue::string(value.as_bytes()),
                None => ReplyValue::Nil,
            },
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Nil,
    }
}

pub fn hgetall(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("hgetall");
    }

    let list = db.read();
    match list.find(statement) {
        Some(entry) => match entry.value.as_hash() {
            Ok(hash) => {
                let mut replies = Vec::with_capacity(hash.len() * 2);
                for (field, value) in hash {
                    replies.push(Reply::new(ReplyValue::string(field.as_bytes())));
                    replies.push(Reply::new(ReplyValue::string(value.as_bytes())));
                }
                ReplyValue::Array(replies)
            }
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Array(Vec::new()),
    }
}

pub fn hincr_by(db: &Database, statement: &str) -> ReplyValue {
    let (key, rest) = split_first(statement);
    let (field, delta) = split_first(rest);
    if key.is_empty() || field.is_empty() || delta.is_empty() {
        return wrong_args("hincrby");
    }
    let delta = match parse_int(delta) {
        Ok(n) => n,
        Err(e) => return ReplyValue::error(e),
    };

    let mut list = db.write();
    match list.find_mut(key) {
        Some(entry) => match entry.value.as_hash_mut() {
            Ok(hash) => match hash.get_mut(field) {
                Some(value) => {
                    let Some(current) = value.parse::<i64>().ok() else {
                        return ReplyValue::error(StoreError::NotInteger);
                    };
                    let Some(next) = current.checked_add(delta) else {
                        return ReplyValue::error(StoreError::NotInteger);
                    };
                    *value = next.to_string();
                    ReplyValue::Integer(next)
                }
                None => {
                    hash.insert(field.to_string(), delta.to_string());
                    ReplyValue::Integer(delta)
                }
            },
            Err(e) => ReplyValue::error(e),
        },
        None => {
            let hash: HashMap<String, String> =
                [(field.to_string(), delta.to_string())].into_iter().collect();
            list.insert(Entry::new(key.to_string(), Value::Hash(hash)));
            ReplyValue::Integer(delta)
        }
    }
}

pub fn hkeys(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("hkeys");
    }

    let list = db.read();
    match list.find(statement) {
        Some(entry) => match entry.value.as_hash() {
            Ok(hash) => ReplyValue::Array(
                hash.keys()
                    .map(|field| Reply::new(ReplyValue::string(field.as_bytes())))
                    .collect(),
            ),
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Array(Vec::new()),
    }
}

pub fn hlen(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("hlen");
    }

    let list = db.read();
    match list.find(statement) {
        Some(entry) => match entry.value.as_hash() {
            Ok(hash) => ReplyValue::Integer(hash.len() as i64),
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Integer(0),
    }
}

pub fn hset(db: &Database, statement: &str) -> ReplyValue {
    let (key, rest) = split_first(statement);
    if key.is_empty() || rest.is_empty() {
        return wrong_args("hset");
    }
    let tokens: Vec<&str> = rest.split(' ').collect();
    if tokens.len() % 2 != 0 {
        return wrong_args("hset");
    }

    let mut list = db.write();
    match list.find_mut(key) {
        Some(entry) => match entry.value.as_hash_mut() {
            Ok(hash) => {
                let mut added = 0;
                for pair in tokens.chunks(2) {
                    if hash.insert(pair[0].to_string(), pair[1].to_string()).is_none() {
                        added += 1;
                    }
                }
                ReplyValue::Integer(added)
            }
            Err(e) => ReplyValue::error(e),
        },
        None => {
            let hash: HashMap<String, String> = tokens
                .chunks(2)
                .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                .collect();
            let added = hash.len();
            list.insert(Entry::new(key.to_string(), Value::Hash(hash)));
            ReplyValue::Integer(added as i64)
        }
    }
}

pub fn hvals(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("hvals");
    }

    let list = db.read();
    match list.find(statement) {
        Some(entry) => match entry.value.as_hash() {
            Ok(hash) => ReplyValue::Array(
                hash.values()
                    .map(|value| Reply::new(ReplyValue::string(value.as_bytes())))
                    .collect(),
            ),
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Array(Vec::new()),
    }
}

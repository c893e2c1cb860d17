use crate::command::{parse_int, split_first, wrong_args};
use crate::protocol::ReplyValue;
use crate::store::{Database, Entry};
use crate::types::Value;
use std::collections::VecDeque;

pub fn lindex(db: &Database, statement: &str) -> ReplyValue {
    let (key, index) = split_first(statement);
    if key.is_empty() || index.is_empty() {
        return wrong_args("lindex");
    }
    let index = match parse_int(index) {
        Ok(n) => n,
        Err(e) => return ReplyValue::error(e),
    };

    let list = db.read();
    match list.find(key) {
        Some(entry) => match entry.value.as_list() {
            Ok(elements) => {
                let len = elements.len() as i64;
                let index = if index < 0 { len + index } else { index };
                if index < 0 || index >= len {
                    return ReplyValue::Nil;
                }
                ReplyValue::string(elements[index as usize].as_bytes())
            }
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Nil,
    }
}

pub fn llen(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("llen");
    }

    let list = db.read();
    match list.find(statement) {
        Some(entry) => match entry.value.as_list() {
            Ok(elements) => ReplyValue::Integer(elements.len() as i64),
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Integer(0),
    }
}

pub fn lpop(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("lpop");
    }

    let mut list = db.write();
    match list.find_mut(statement) {
        Some(entry) => match entry.value.as_list_mut() {
            Ok(elements) => match elements.pop_front() {
                Some(element) => ReplyValue::string(element.into_bytes()),
                None => ReplyValue::Nil,
            },
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Nil,
    }
}

pub fn lpush(db: &Database, statement: &str) -> ReplyValue {
    let (key, elements) = split_first(statement);
    if key.is_empty() || elements.is_empty() {
        return wrong_args("lpush");
    }

    let mut list = db.write();
    match list.find_mut(key) {
        Some(entry) => match entry.value.as_list_mut() {
            Ok(stored) => {
                for element in elements.split(' ') {
                    stored.push_front(element.to_string());
                }
                ReplyValue::Integer(stored.len() as i64)
            }
            Err(e) => ReplyValue::error(e),
        },
        None => {
            let mut stored = VecDeque::new();
            for element in elements.split(' ') {
                stored.push_front(element.to_string());
            }
            let len = stored.len();
            list.insert(Entry::new(key.to_string(), Value::List(stored)));
            ReplyValue::Integer(len as i64)
        }
    }
}

pub fn lpush_x(db: &Database, statement: &str) -> ReplyValue {
    let (key, elements) = split_first(statement);
    if key.is_empty() || elements.is_empty() {
        return wrong_args("lpushx");
    }

    let mut list = db.write();
    match list.find_mut(key) {
        Some(entry) => match entry.value.as_list_mut() {
            Ok(stored) => {
                for element in elements.split(' ') {
                    stored.push_front(element.to_string());
                }
                ReplyValue::Integer(stored.len() as i64)
            }
            Err(e) => ReplyValue::error(e),
        },
        None => ReplyValue::Integer(0),
    }
}

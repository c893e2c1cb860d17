use crate::command::{split_first, wrong_args};
use crate::error::StoreError;
use crate::protocol::ReplyValue;
use crate::store::{Database, Store};

pub fn del(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("del");
    }

    let mut list = db.write();
    let count = statement.split(' ').filter(|key| list.erase(key)).count();
    ReplyValue::Integer(count as i64)
}

pub fn exists(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("exists");
    }

    let list = db.read();
    let count = statement.split(' ').filter(|key| list.contains(key)).count();
    ReplyValue::Integer(count as i64)
}

/// Move a key to another database: succeeds iff the source holds the key and
/// the target does not, atomically under both locks (taken in ascending index
/// order so concurrent MOVEs cannot deadlock).
pub fn move_key(store: &Store, source_index: usize, statement: &str) -> ReplyValue {
    let (key, target) = split_first(statement);
    if key.is_empty() || target.is_empty() {
        return wrong_args("move");
    }
    let target_index = match target.parse::<usize>() {
        Ok(index) if index < store.len() => index,
        _ => return ReplyValue::error(StoreError::NotInteger),
    };

    // Same database: the key cannot be present in the source yet absent from
    // the target, so the move can never apply.
    if target_index == source_index {
        return ReplyValue::Integer(0);
    }

    let source = store.db(source_index);
    let target = store.db(target_index);
    let (mut first, mut second) = if source_index < target_index {
        (source.write(), target.write())
    } else {
        (target.write(), source.write())
    };
    let (source_list, target_list) = if source_index < target_index {
        (&mut first, &mut second)
    } else {
        (&mut second, &mut first)
    };

    if source_list.contains(key) && !target_list.contains(key) {
        let entry = source_list.remove(key).expect("key checked present");
        target_list.insert(entry);
        ReplyValue::Integer(1)
    } else {
        ReplyValue::Integer(0)
    }
}

pub fn rename(db: &Database, statement: &str) -> ReplyValue {
    let (old, new) = split_first(statement);
    if old.is_empty() || new.is_empty() {
        return wrong_args("rename");
    }

    let mut list = db.write();
    match list.remove(old) {
        Some(mut entry) => {
            entry.key = new.to_string();
            list.insert(entry);
            ReplyValue::ok()
        }
        None => ReplyValue::error(StoreError::NoSuchKey),
    }
}

pub fn rename_nx(db: &Database, statement: &str) -> ReplyValue {
    let (old, new) = split_first(statement);
    if old.is_empty() || new.is_empty() {
        return wrong_args("renamenx");
    }

    let mut list = db.write();
    if !list.contains(old) || list.contains(new) {
        return ReplyValue::Integer(0);
    }

    let mut entry = list.remove(old).expect("key checked present");
    entry.key = new.to_string();
    list.insert(entry);
    ReplyValue::Integer(1)
}

pub fn key_type(db: &Database, statement: &str) -> ReplyValue {
    if statement.is_empty() {
        return wrong_args("type");
    }

    let list = db.read();
    let name = match list.find(statement) {
        Some(entry) => entry.value.type_name(),
        None => "none",
    };
    ReplyValue::status(name)
}

pub mod sorted_set;

use crate::error::StoreError;
use sorted_set::SortedSet;
use std::collections::{HashMap, HashSet, VecDeque};

/// The core value stored under a key.
///
/// String payloads are raw bytes: SETBIT and SETRANGE can produce contents
/// that are not valid UTF-8. Hash fields, list elements and set members come
/// from space-split command tokens and stay `String`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Vec<u8>),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Set(HashSet<String>),
    SortedSet(SortedSet),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Hash(_) => "hash",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "zset",
        }
    }

    pub fn as_string(&self) -> Result<&Vec<u8>, StoreError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(StoreError::WrongType),
        }
    }

    pub fn as_string_mut(&mut self) -> Result<&mut Vec<u8>, StoreError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(StoreError::WrongType),
        }
    }

    pub fn as_hash(&self) -> Result<&HashMap<String, String>, StoreError> {
        match self {
            Value::Hash(h) => Ok(h),
            _ => Err(StoreError::WrongType),
        }
    }

    pub fn as_hash_mut(&mut self) -> Result<&mut HashMap<String, String>, StoreError> {
        match self {
            Value::Hash(h) => Ok(h),
            _ => Err(StoreError::WrongType),
        }
    }

    pub fn as_list(&self) -> Result<&VecDeque<String>, StoreError> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(StoreError::WrongType),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut VecDeque<String>, StoreError> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(StoreError::WrongType),
        }
    }

    pub fn as_set(&self) -> Result<&HashSet<String>, StoreError> {
        match self {
            Value::Set(s) => Ok(s),
            _ => Err(StoreError::WrongType),
        }
    }

    pub fn as_sorted_set(&self) -> Result<&SortedSet, StoreError> {
        match self {
            Value::SortedSet(z) => Ok(z),
            _ => Err(StoreError::WrongType),
        }
    }
}

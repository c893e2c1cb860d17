pub mod entry;
pub mod skiplist;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use skiplist::SkipList;
use std::sync::Arc;

pub const DATABASE_COUNT: usize = 16;

/// One indexed keyspace. The lock wraps the whole skip list: read-only
/// commands take it shared, mutating commands exclusive.
#[derive(Debug)]
pub struct Database {
    index: usize,
    list: RwLock<SkipList>,
}

impl Database {
    pub fn new(index: usize) -> Self {
        Database {
            index,
            list: RwLock::new(SkipList::new()),
        }
    }

    pub fn from_list(index: usize, list: SkipList) -> Self {
        Database {
            index,
            list: RwLock::new(list),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SkipList> {
        self.list.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SkipList> {
        self.list.write()
    }

    /// Snapshot frame: `u64 length ∥ skip list bytes`.
    pub fn serialize(&self) -> Vec<u8> {
        let bytes = self.read().serialize();
        let mut buf = Vec::with_capacity(8 + bytes.len());
        buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
        buf.extend_from_slice(&bytes);
        buf
    }
}

/// The complete data store — all numbered databases.
#[derive(Debug)]
pub struct Store {
    databases: Vec<Database>,
}

impl Store {
    pub fn new(count: usize) -> Self {
        Store {
            databases: (0..count).map(Database::new).collect(),
        }
    }

    pub fn from_lists(lists: Vec<SkipList>) -> Self {
        Store {
            databases: lists
                .into_iter()
                .enumerate()
                .map(|(index, list)| Database::from_list(index, list))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    pub fn db(&self, index: usize) -> &Database {
        &self.databases[index]
    }

    pub fn get(&self, index: usize) -> Option<&Database> {
        self.databases.get(index)
    }

    pub fn databases(&self) -> &[Database] {
        &self.databases
    }
}

pub type SharedStore = Arc<Store>;

pub use entry::Entry;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn test_database_serialize_frames_length() {
        let db = Database::new(0);
        assert_eq!(db.serialize(), 0u64.to_le_bytes().to_vec());

        db.write().insert(Entry::new(
            "k".to_string(),
            Value::String(b"v".to_vec()),
        ));
        let buf = db.serialize();
        let len = u64::from_le_bytes(buf[..8].try_into().unwrap()) as usize;
        assert_eq!(len, buf.len() - 8);

        let list = SkipList::deserialize(&buf[8..]).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_store_shape() {
        let store = Store::new(DATABASE_COUNT);
        assert_eq!(store.len(), DATABASE_COUNT);
        assert_eq!(store.db(3).index(), 3);
        assert!(store.get(16).is_none());
    }
}


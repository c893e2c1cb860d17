use crate::error::StoreResult;
use crate::store::entry::Entry;
use rand::Rng;

const MAX_LEVEL: usize = 32;

type NodeId = usize;
type EntrySlot = usize;

/// Ordered index from string keys to entries.
///
/// Thirty-two singly-linked levels, each headed by a sentinel; level 0 holds
/// every key, level L a coin-flip subsequence of level L-1. Nodes live in an
/// arena and reference entries by slot, so the levels of one key all share a
/// single entry without shared ownership. No internal locking — the owning
/// database serializes access.
#[derive(Debug, Clone)]
pub struct SkipList {
    nodes: Vec<Node>,
    free_nodes: Vec<NodeId>,
    entries: Vec<Option<Entry>>,
    free_entries: Vec<EntrySlot>,
    heads: [NodeId; MAX_LEVEL],
    len: usize,
}

#[derive(Debug, Clone)]
struct Node {
    /// None marks a sentinel.
    entry: Option<EntrySlot>,
    next: Option<NodeId>,
    down: Option<NodeId>,
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipList {
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(MAX_LEVEL);
        let mut heads = [0; MAX_LEVEL];
        let mut below = None;
        for head in heads.iter_mut() {
            let id = nodes.len();
            nodes.push(Node {
                entry: None,
                next: None,
                down: below,
            });
            *head = id;
            below = Some(id);
        }

        SkipList {
            nodes,
            free_nodes: Vec::new(),
            entries: Vec::new(),
            free_entries: Vec::new(),
            heads,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn find(&self, key: &str) -> Option<&Entry> {
        let slot = self.find_slot(key)?;
        self.entries[slot].as_ref()
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut Entry> {
        let slot = self.find_slot(key)?;
        self.entries[slot].as_mut()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find_slot(key).is_some()
    }

    /// Upsert: replace the stored entry when the key exists, otherwise splice
    /// a node chain on levels 0..=h for a coin-flipped h.
    pub fn insert(&mut self, entry: Entry) {
        if let Some(slot) = self.find_slot(&entry.key) {
            self.entries[slot] = Some(entry);
            return;
        }

        let height = random_height();
        let slot = self.alloc_entry(entry);

        let mut node = self.heads[height];
        let mut above: Option<NodeId> = None;
        loop {
            while let Some(next) = self.nodes[node].next {
                if self.key_of(next) < self.entry_key(slot) {
                    node = next;
                } else {
                    break;
                }
            }

            let id = self.alloc_node(Node {
                entry: Some(slot),
                next: self.nodes[node].next,
                down: None,
            });
            self.nodes[node].next = Some(id);
            if let Some(above) = above {
                self.nodes[above].down = Some(id);
            }
            above = Some(id);

            match self.nodes[node].down {
                Some(down) => node = down,
                None => break,
            }
        }

        self.len += 1;
    }

    /// Unlink a key from every level and hand back its entry.
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        let mut removed = None;

        let mut node = self.heads[MAX_LEVEL - 1];
        loop {
            while let Some(next) = self.nodes[node].next {
                if self.key_of(next) < key {
                    node = next;
                } else {
                    break;
                }
            }

            if let Some(next) = self.nodes[node].next {
                if self.key_of(next) == key {
                    removed = self.nodes[next].entry;
                    self.nodes[node].next = self.nodes[next].next;
                    self.free_nodes.push(next);
                }
            }

            match self.nodes[node].down {
                Some(down) => node = down,
                None => break,
            }
        }

        let slot = removed?;
        self.len -= 1;
        self.free_entries.push(slot);
        self.entries[slot].take()
    }

    pub fn erase(&mut self, key: &str) -> bool {
        self.remove(key).is_some()
    }

    /// Level-0 scan, ascending key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            node: self.nodes[self.heads[0]].next,
        }
    }

    /// Level-0 scan, each entry framed with its u64 length.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for entry in self.iter() {
            let bytes = entry.serialize();
            buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
            buf.extend_from_slice(&bytes);
        }
        buf
    }

    pub fn deserialize(mut buf: &[u8]) -> StoreResult<SkipList> {
        let mut list = SkipList::new();
        while !buf.is_empty() {
            if buf.len() < 8 {
                return Err(crate::error::StoreError::Malformed(
                    "truncated entry frame",
                ));
            }
            let len = u64::from_le_bytes(buf[..8].try_into().expect("slice is exactly 8 bytes"))
                as usize;
            buf = &buf[8..];
            if buf.len() < len {
                return Err(crate::error::StoreError::Malformed(
                    "truncated entry frame",
                ));
            }
            list.insert(Entry::from_bytes(&buf[..len])?);
            buf = &buf[len..];
        }
        Ok(list)
    }

    /// Walk from the top sentinel: move right while the next key is <= the
    /// target, return on a match, otherwise descend.
    fn find_slot(&self, key: &str) -> Option<EntrySlot> {
        let mut node = self.heads[MAX_LEVEL - 1];
        loop {
            while let Some(next) = self.nodes[node].next {
                if self.key_of(next) <= key {
                    node = next;
                } else {
                    break;
                }
            }

            if let Some(slot) = self.nodes[node].entry {
                if self.entry_key(slot) == key {
                    return Some(slot);
                }
            }

            match self.nodes[node].down {
                Some(down) => node = down,
                None => return None,
            }
        }
    }

    fn key_of(&self, node: NodeId) -> &str {
        let slot = self.nodes[node].entry.expect("non-sentinel node");
        self.entry_key(slot)
    }

    fn entry_key(&self, slot: EntrySlot) -> &str {
        &self.entries[slot].as_ref().expect("occupied entry slot").key
    }

    fn alloc_entry(&mut self, entry: Entry) -> EntrySlot {
        match self.free_entries.pop() {
            Some(slot) => {
                self.entries[slot] = Some(entry);
                slot
            }
            None => {
                self.entries.push(Some(entry));
                self.entries.len() - 1
            }
        }
    }

    fn alloc_node(&mut self, node: Node) -> NodeId {
        match self.free_nodes.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }
}

/// Fair coin flips: stop on the first tails, cap at the top level.
fn random_height() -> usize {
    let mut rng = rand::thread_rng();
    let mut height = 0;
    while height < MAX_LEVEL - 1 && rng.gen_bool(0.5) {
        height += 1;
    }
    height
}

pub struct Iter<'a> {
    list: &'a SkipList,
    node: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.node?;
        self.node = self.list.nodes[id].next;
        let slot = self.list.nodes[id].entry.expect("non-sentinel node");
        self.list.entries[slot].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    fn string_entry(key: &str, value: &str) -> Entry {
        Entry::new(key.to_string(), Value::String(value.as_bytes().to_vec()))
    }

    #[test]
    fn test_insert_find() {
        let mut list = SkipList::new();
        assert!(list.find("a").is_none());

        list.insert(string_entry("a", "1"));
        list.insert(string_entry("b", "2"));

        assert_eq!(list.len(), 2);
        assert_eq!(list.find("a").unwrap().value, Value::String(b"1".to_vec()));
        assert_eq!(list.find("b").unwrap().value, Value::String(b"2".to_vec()));
        assert!(list.find("c").is_none());
    }

    #[test]
    fn test_upsert_replaces_value() {
        let mut list = SkipList::new();
        for _ in 0..4 {
            // Repeated reinsertion must not duplicate the key at any level.
            list.insert(string_entry("k", "old"));
        }
        list.insert(string_entry("x", "1"));
        list.insert(string_entry("k", "new"));

        assert_eq!(list.len(), 2);
        assert_eq!(
            list.find("k").unwrap().value,
            Value::String(b"new".to_vec())
        );
        assert_eq!(list.find("x").unwrap().value, Value::String(b"1".to_vec()));
    }

    #[test]
    fn test_erase() {
        let mut list = SkipList::new();
        list.insert(string_entry("a", "1"));
        list.insert(string_entry("b", "2"));

        assert!(list.erase("a"));
        assert!(!list.erase("a"));
        assert!(list.find("a").is_none());
        assert_eq!(list.len(), 1);
        assert!(list.find("b").is_some());
    }

    #[test]
    fn test_remove_returns_entry() {
        let mut list = SkipList::new();
        list.insert(string_entry("a", "1"));

        let entry = list.remove("a").unwrap();
        assert_eq!(entry.key, "a");
        assert!(list.is_empty());
        assert!(list.remove("a").is_none());
    }

    #[test]
    fn test_level0_ascending_order() {
        let mut list = SkipList::new();
        let mut keys: Vec<String> = (0..200).map(|i| format!("key{i:03}")).collect();
        // Insert shuffled by a fixed stride.
        for i in (0..keys.len()).map(|i| i * 37 % 200) {
            list.insert(string_entry(&keys[i], "v"));
        }

        keys.sort();
        let seen: Vec<&str> = list.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(seen, keys.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_find_mut_mutates_in_place() {
        let mut list = SkipList::new();
        list.insert(string_entry("k", "abc"));

        if let Value::String(s) = &mut list.find_mut("k").unwrap().value {
            s.extend_from_slice(b"def");
        }
        assert_eq!(
            list.find("k").unwrap().value,
            Value::String(b"abcdef".to_vec())
        );
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut list = SkipList::new();
        for i in 0..50 {
            list.insert(string_entry(&format!("k{i}"), &format!("v{i}")));
        }

        let parsed = SkipList::deserialize(&list.serialize()).unwrap();
        assert_eq!(parsed.len(), list.len());
        for (a, b) in parsed.iter().zip(list.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_deserialize_empty() {
        assert!(SkipList::deserialize(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_deserialize_truncated() {
        let mut list = SkipList::new();
        list.insert(string_entry("k", "v"));
        let buf = list.serialize();
        assert!(SkipList::deserialize(&buf[..buf.len() - 1]).is_err());
        assert!(SkipList::deserialize(&buf[..4]).is_err());
    }

    #[test]
    fn test_clone_is_disjoint() {
        let mut list = SkipList::new();
        list.insert(string_entry("a", "1"));

        let mut copy = list.clone();
        copy.insert(string_entry("b", "2"));
        if let Value::String(s) = &mut copy.find_mut("a").unwrap().value {
            *s = b"changed".to_vec();
        }

        assert_eq!(list.len(), 1);
        assert!(list.find("b").is_none());
        assert_eq!(list.find("a").unwrap().value, Value::String(b"1".to_vec()));
    }

    #[test]
    fn test_slot_reuse_after_erase() {
        let mut list = SkipList::new();
        for round in 0..5 {
            for i in 0..20 {
                list.insert(string_entry(&format!("k{i}"), &format!("r{round}")));
            }
            for i in 0..20 {
                assert!(list.erase(&format!("k{i}")));
            }
            assert!(list.is_empty());
        }
    }
}

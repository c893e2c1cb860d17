use crate::error::{StoreError, StoreResult};
use crate::store::skiplist::SkipList;
use crate::store::Store;

/// Full point-in-time image: every database's `u64 length ∥ skip list bytes`
/// frame, concatenated in index order.
pub fn snapshot(store: &Store) -> Vec<u8> {
    let mut buf = Vec::new();
    for db in store.databases() {
        buf.extend_from_slice(&db.serialize());
    }
    buf
}

/// The image of a store with nothing in it: one zero-length frame per
/// database.
pub fn empty_image(databases: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(databases * 8);
    for _ in 0..databases {
        buf.extend_from_slice(&0u64.to_le_bytes());
    }
    buf
}

/// Consume `databases` snapshot frames from the head of a persistence file
/// and rebuild the store. Returns the unread tail (the AOF records).
pub fn parse(buf: &[u8], databases: usize) -> StoreResult<(Store, &[u8])> {
    let mut rest = buf;
    let mut lists = Vec::with_capacity(databases);

    for _ in 0..databases {
        if rest.len() < 8 {
            return Err(StoreError::Malformed("truncated snapshot frame"));
        }
        let len =
            u64::from_le_bytes(rest[..8].try_into().expect("slice is exactly 8 bytes")) as usize;
        rest = &rest[8..];
        if rest.len() < len {
            return Err(StoreError::Malformed("truncated snapshot frame"));
        }
        lists.push(SkipList::deserialize(&rest[..len])?);
        rest = &rest[len..];
    }

    Ok((Store::from_lists(lists), rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entry, DATABASE_COUNT};
    use crate::types::Value;

    #[test]
    fn test_empty_image_shape() {
        let image = empty_image(DATABASE_COUNT);
        assert_eq!(image.len(), DATABASE_COUNT * 8);
        assert!(image.iter().all(|&b| b == 0));

        let (store, rest) = parse(&image, DATABASE_COUNT).unwrap();
        assert!(rest.is_empty());
        assert_eq!(store.len(), DATABASE_COUNT);
        assert!(store.db(0).read().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let store = Store::new(DATABASE_COUNT);
        store.db(0).write().insert(Entry::new(
            "foo".to_string(),
            Value::String(b"bar".to_vec()),
        ));
        store.db(5).write().insert(Entry::new(
            "baz".to_string(),
            Value::String(b"qux".to_vec()),
        ));

        let image = snapshot(&store);
        let (parsed, rest) = parse(&image, DATABASE_COUNT).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            parsed.db(0).read().find("foo").unwrap().value,
            Value::String(b"bar".to_vec())
        );
        assert_eq!(
            parsed.db(5).read().find("baz").unwrap().value,
            Value::String(b"qux".to_vec())
        );
        assert!(parsed.db(1).read().is_empty());
    }

    #[test]
    fn test_parse_keeps_tail() {
        let mut image = empty_image(DATABASE_COUNT);
        image.extend_from_slice(b"leftover records");
        let (_, rest) = parse(&image, DATABASE_COUNT).unwrap();
        assert_eq!(rest, b"leftover records");
    }

    #[test]
    fn test_parse_truncated() {
        let image = empty_image(DATABASE_COUNT);
        assert!(parse(&image[..image.len() - 4], DATABASE_COUNT).is_err());
        assert!(parse(&[], DATABASE_COUNT).is_err());
    }
}

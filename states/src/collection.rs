//! Versioned JSON collections on top of a [`KeyValueStore`].
//!
//! On disk a collection is `{"version": 1, "items": [...]}`. A bare JSON array
//! is the legacy unversioned layout and is still accepted on read; the next
//! save rewrites it with a version tag.
//!
//! Reads never fail: an absent key, malformed JSON, an item that does not
//! deserialize, or a version newer than [`SCHEMA_VERSION`] all yield an empty
//! collection.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{KeyValueStore, StorageError};

/// Current persisted layout version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Deserialize)]
#[serde(untagged)]
enum Stored<T> {
    Versioned { version: u32, items: Vec<T> },
    Legacy(Vec<T>),
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    version: u32,
    items: &'a [T],
}

/// Loads the collection stored under `key`, or an empty one.
pub fn load_collection<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Reading {key} failed, treating as empty: {e}");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Stored<T>>(&raw) {
        Ok(Stored::Versioned { version, items }) if version <= SCHEMA_VERSION => items,
        Ok(Stored::Versioned { version, .. }) => {
            warn!("{key} has unsupported version {version}, treating as empty");
            Vec::new()
        }
        Ok(Stored::Legacy(items)) => items,
        Err(e) => {
            warn!("{key} is corrupt, treating as empty: {e}");
            Vec::new()
        }
    }
}

/// Replaces the collection stored under `key` with `items`.
pub fn save_collection<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[T],
) -> Result<(), StorageError> {
    let envelope = Envelope {
        version: SCHEMA_VERSION,
        items,
    };
    let json = serde_json::to_string(&envelope).map_err(|e| StorageError::serialize(key, e))?;
    store.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
    }

    fn item(name: &str) -> Item {
        Item {
            name: name.to_owned(),
        }
    }

    #[test]
    fn absent_key_is_empty() {
        let store = MemoryStore::new();
        let items: Vec<Item> = load_collection(&store, "k");
        assert!(items.is_empty());
    }

    #[test]
    fn save_then_load_keeps_order() {
        let store = MemoryStore::new();
        save_collection(&store, "k", &[item("a"), item("b")]).expect("save");

        let raw = store.get("k").expect("get").expect("value");
        assert!(raw.starts_with("{\"version\":1,"), "unexpected layout: {raw}");

        let items: Vec<Item> = load_collection(&store, "k");
        assert_eq!(items, vec![item("a"), item("b")]);
    }

    #[test]
    fn corrupt_json_is_empty() {
        let store = MemoryStore::with_value("k", "{not json");
        let items: Vec<Item> = load_collection(&store, "k");
        assert!(items.is_empty());
    }

    #[test]
    fn wrong_item_shape_is_empty_not_partial() {
        let store = MemoryStore::with_value(
            "k",
            r#"{"version":1,"items":[{"name":"ok"},{"other":true}]}"#,
        );
        let items: Vec<Item> = load_collection(&store, "k");
        assert!(items.is_empty());
    }

    #[test]
    fn legacy_bare_array_is_accepted() {
        let store = MemoryStore::with_value("k", r#"[{"name":"old"}]"#);
        let items: Vec<Item> = load_collection(&store, "k");
        assert_eq!(items, vec![item("old")]);
    }

    #[test]
    fn future_version_is_empty() {
        let store = MemoryStore::with_value("k", r#"{"version":2,"items":[{"name":"x"}]}"#);
        let items: Vec<Item> = load_collection(&store, "k");
        assert!(items.is_empty());
    }

    #[test]
    fn non_collection_json_is_empty() {
        let store = MemoryStore::with_value("k", "42");
        let items: Vec<Item> = load_collection(&store, "k");
        assert!(items.is_empty());
    }
}

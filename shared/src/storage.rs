//! Device-local key/value persistence.
//!
//! Every piece of state this application keeps on the device lives in one
//! named record. Records serialize themselves; a record whose stored content
//! cannot be read back is reported once in the log and treated as absent.

use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub const DEVICE_ID_KEY: &str = "anonymous_voter_user_id";
pub const VOTES_KEY: &str = "anonymous_voter_votes";
pub const POWERUPS_KEY: &str = "gradence-powerups";
pub const SPIN_KEY: &str = "gradence-spin";
pub const VISITED_KEY: &str = "gradence-has-visited";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Local storage is not available")]
    Unavailable,

    #[error("Storage backend failed: {0}")]
    Backend(String),

    #[error("Can't serialize record {key:?}: {source}")]
    Serialize {
        key: &'static str,
        source: serde_json::Error,
    },
}

/// String-keyed storage with the semantics of the browser `localStorage`.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// A JSON encoded value stored under a fixed key.
pub struct LocalRecord<'a, S: ?Sized, T> {
    store: &'a S,
    key: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<'a, S, T> LocalRecord<'a, S, T>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: &'a S, key: &'static str) -> Self {
        Self {
            store,
            key,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn get(&self) -> Option<T> {
        let raw = match self.store.get_item(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key = self.key, %err, "can't read local record");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = self.key, %err, "malformed local record, using default");
                None
            }
        }
    }

    pub fn set(&self, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: self.key,
            source,
        })?;

        self.store.set_item(self.key, &raw)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove_item(self.key)
    }
}

impl<'a, S, T> LocalRecord<'a, S, T>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + DeserializeOwned + Default,
{
    pub fn get_or_default(&self) -> T {
        self.get().unwrap_or_default()
    }

    /// Read-modify-write of the whole record. Last writer wins.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StorageError> {
        let mut value = self.get_or_default();
        let result = f(&mut value);
        self.set(&value)?;
        Ok(result)
    }
}

/// A plain string stored under a fixed key, without any encoding.
pub struct TextRecord<'a, S: ?Sized> {
    store: &'a S,
    key: &'static str,
}

impl<'a, S: KeyValueStore + ?Sized> TextRecord<'a, S> {
    pub fn new(store: &'a S, key: &'static str) -> Self {
        Self { store, key }
    }

    pub fn get(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .store
            .get_item(self.key)?
            .filter(|value| !value.trim().is_empty()))
    }

    pub fn set(&self, value: &str) -> Result<(), StorageError> {
        self.store.set_item(self.key, value)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove_item(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingStore;
    use std::collections::BTreeMap;

    #[test]
    fn record_roundtrips_through_the_store() {
        let store = MemoryStore::new();
        let record: LocalRecord<_, BTreeMap<String, i32>> = LocalRecord::new(&store, "numbers");

        assert!(record.get().is_none());

        record
            .update(|numbers| numbers.insert("a".to_string(), 1))
            .unwrap();
        record
            .update(|numbers| numbers.insert("b".to_string(), 2))
            .unwrap();

        let numbers = record.get().unwrap();
        assert_eq!(numbers.len(), 2);
        assert_eq!(numbers["b"], 2);

        record.clear().unwrap();
        assert!(record.get().is_none());
    }

    #[test]
    fn malformed_content_reads_as_default() {
        let store = MemoryStore::new();
        store.set_item("numbers", "{not json").unwrap();

        let record: LocalRecord<_, BTreeMap<String, i32>> = LocalRecord::new(&store, "numbers");
        assert!(record.get().is_none());
        assert!(record.get_or_default().is_empty());
    }

    #[test]
    fn failing_store_reads_as_absent() {
        let record: LocalRecord<_, Vec<u8>> = LocalRecord::new(&FailingStore, "bytes");

        assert!(record.get().is_none());
        assert!(matches!(record.set(&vec![1]), Err(StorageError::Unavailable)));
    }

    #[test]
    fn blank_text_counts_as_missing() {
        let store = MemoryStore::new();
        let record = TextRecord::new(&store, "token");

        record.set("  ").unwrap();
        assert_eq!(record.get().unwrap(), None);

        record.set("abc").unwrap();
        assert_eq!(record.get().unwrap().as_deref(), Some("abc"));
    }
}

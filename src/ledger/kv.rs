//! The key/value ledger capability.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::CompositeKey;
use crate::dex::{ErrorKind, Result};
use crate::error_here;

/// Deterministic string-keyed object store.
///
/// Range iteration is lexicographic on the composite key. Write versions
/// are advisory: stores that do not track them report zero and staged
/// commits then skip conflict detection.
pub trait ObjectStore {
    fn get_bytes(&self, key: &str) -> Option<Vec<u8>>;
    fn put_bytes(&mut self, key: String, value: Vec<u8>);
    fn delete(&mut self, key: &str);
    /// All entries whose key starts with `prefix`, in key order.
    fn range_by_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)>;

    /// Monotonic counter bumped on every write to this store.
    fn current_version(&self) -> u64 {
        0
    }

    /// Version at which `key` was last written; zero if never.
    fn write_version(&self, _key: &str) -> u64 {
        0
    }
}

/// Typed accessors layered over the raw byte interface. Objects are stored
/// as canonical JSON.
pub trait ObjectStoreExt: ObjectStore {
    fn get_object<T: DeserializeOwned>(&self, key: &CompositeKey) -> Result<Option<T>> {
        match self.get_bytes(key.as_str()) {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| error_here!(ErrorKind::StoredObjectCorrupt(e.to_string()))),
        }
    }

    fn put_object<T: Serialize>(&mut self, key: &CompositeKey, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| error_here!(ErrorKind::StoredObjectCorrupt(e.to_string())))?;
        self.put_bytes(key.as_str().to_string(), bytes);
        Ok(())
    }

    fn range_objects<T: DeserializeOwned>(
        &self,
        prefix: &CompositeKey,
    ) -> Result<Vec<(String, T)>> {
        self.range_by_prefix(prefix.as_str())
            .into_iter()
            .map(|(key, bytes)| {
                serde_json::from_slice(&bytes)
                    .map(|value| (key, value))
                    .map_err(|e| error_here!(ErrorKind::StoredObjectCorrupt(e.to_string())))
            })
            .collect()
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}

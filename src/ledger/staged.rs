//! Staged write sets over a parent store.
//!
//! A [`StagedView`] is not a nested database transaction: it is a plain
//! overlay map of pending writes and deletes. Reads fall through to the
//! parent, range scans merge, and the whole set is either promoted into the
//! parent or discarded. The limit-order fill uses one view per pool; the
//! host wraps every request in one for atomicity.

use std::collections::BTreeMap;

use super::kv::ObjectStore;
use crate::dex::{ErrorKind, Result};
use crate::error_here;

pub struct StagedView<'a> {
    parent: &'a mut dyn ObjectStore,
    /// Parent version when the view was opened; promote refuses to clobber
    /// keys the parent has written since.
    snapshot_version: u64,
    /// `None` marks a staged delete.
    writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl<'a> StagedView<'a> {
    pub fn new(parent: &'a mut dyn ObjectStore) -> Self {
        let snapshot_version = parent.current_version();
        Self {
            parent,
            snapshot_version,
            writes: BTreeMap::new(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Flush the staged writes into the parent. Fails with a state conflict
    /// if the parent has written any staged key since this view was opened;
    /// nothing is applied in that case.
    pub fn promote(self) -> Result<()> {
        for key in self.writes.keys() {
            if self.parent.write_version(key) > self.snapshot_version {
                return Err(error_here!(ErrorKind::WriteConflict));
            }
        }
        for (key, value) in self.writes {
            match value {
                Some(bytes) => self.parent.put_bytes(key, bytes),
                None => self.parent.delete(&key),
            }
        }
        Ok(())
    }

    /// Drop the staged writes, leaving the parent untouched.
    pub fn discard(self) {}
}

impl ObjectStore for StagedView<'_> {
    fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(staged) => staged.clone(),
            None => self.parent.get_bytes(key),
        }
    }

    fn put_bytes(&mut self, key: String, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: &str) {
        self.writes.insert(key.to_string(), None);
    }

    fn range_by_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        let mut merged: BTreeMap<String, Vec<u8>> =
            self.parent.range_by_prefix(prefix).into_iter().collect();
        for (key, staged) in self.writes.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match staged {
                Some(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }

    fn current_version(&self) -> u64 {
        self.parent.current_version()
    }

    fn write_version(&self, key: &str) -> u64 {
        self.parent.write_version(key)
    }
}

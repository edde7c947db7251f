//! Deterministic in-memory ledger used by tests and as the reference host.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::kv::ObjectStore;

#[derive(Default, Clone)]
pub struct InMemoryLedger {
    entries: BTreeMap<String, Vec<u8>>,
    versions: BTreeMap<String, u64>,
    version_counter: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn bump(&mut self, key: &str) {
        self.version_counter += 1;
        self.versions.insert(key.to_string(), self.version_counter);
    }
}

impl ObjectStore for InMemoryLedger {
    fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn put_bytes(&mut self, key: String, value: Vec<u8>) {
        self.bump(&key);
        self.entries.insert(key, value);
    }

    fn delete(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.bump(key);
        }
    }

    fn range_by_prefix(&self, prefix: &str) -> Vec<(String, Vec<u8>)> {
        self.entries
            .range::<String, _>((Bound::Included(prefix.to_string()), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn current_version(&self) -> u64 {
        self.version_counter
    }

    fn write_version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_scan_is_prefix_bounded_and_ordered() {
        let mut ledger = InMemoryLedger::new();
        ledger.put_bytes("\u{0}POOL\u{0}a\u{0}b\u{0}100\u{0}".into(), vec![2]);
        ledger.put_bytes("\u{0}POOL\u{0}a\u{0}b\u{0}005\u{0}".into(), vec![0]);
        ledger.put_bytes("\u{0}POOL\u{0}a\u{0}b\u{0}030\u{0}".into(), vec![1]);
        ledger.put_bytes("\u{0}TICK\u{0}x\u{0}".into(), vec![9]);

        let scanned = ledger.range_by_prefix("\u{0}POOL\u{0}a\u{0}b");
        let values: Vec<u8> = scanned.iter().map(|(_, v)| v[0]).collect();
        assert_eq!(values, [0, 1, 2]);
    }

    #[test]
    fn versions_advance_per_write() {
        let mut ledger = InMemoryLedger::new();
        ledger.put_bytes("k".into(), vec![1]);
        let first = ledger.write_version("k");
        ledger.put_bytes("k".into(), vec![2]);
        assert!(ledger.write_version("k") > first);
        ledger.delete("k");
        assert!(ledger.write_version("k") > first + 1);
        assert_eq!(ledger.write_version("missing"), 0);
    }
}

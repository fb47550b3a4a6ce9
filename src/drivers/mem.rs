//! Compiled-in in-memory reference driver.
//!
//! A `BTreeMap`-backed engine used for smoke runs and end-to-end tests.
//! It keeps nothing across opens and provides no durability; real engines
//! live behind the same contract as loadable modules.

use super::{Driver, Storage, StorageOptions};
use crate::{BenchError, BenchResult};
use std::collections::BTreeMap;

pub struct MemDriver;

impl MemDriver {
    pub fn boxed() -> Box<dyn Driver> {
        Box::new(MemDriver)
    }
}

impl Driver for MemDriver {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn open(&self, opts: &StorageOptions) -> BenchResult<Box<dyn Storage>> {
        std::fs::create_dir_all(&opts.path)?;
        Ok(Box::new(MemStorage {
            map: BTreeMap::new(),
        }))
    }
}

struct MemStorage {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

fn not_found(op: &'static str) -> BenchError {
    BenchError::Storage {
        driver: "mem".to_string(),
        op,
        detail: "key not found".to_string(),
    }
}

impl Storage for MemStorage {
    fn replace(&mut self, key: &[u8], val: &[u8]) -> BenchResult<()> {
        self.map.insert(key.to_vec(), val.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &[u8]) -> BenchResult<()> {
        self.map.remove(key).map(|_| ()).ok_or_else(|| not_found("remove"))
    }

    fn select(&mut self, key: &[u8], out: Option<&mut Vec<u8>>) -> BenchResult<()> {
        let val = self.map.get(key).ok_or_else(|| not_found("select"))?;
        if let Some(out) = out {
            out.clear();
            out.extend_from_slice(val);
        }
        Ok(())
    }

    fn close(&mut self) -> BenchResult<()> {
        self.map.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_storage(dir: &TempDir) -> Box<dyn Storage> {
        let opts = StorageOptions {
            path: dir.path().join("mem"),
        };
        MemDriver.open(&opts).unwrap()
    }

    #[test]
    fn open_creates_the_storage_directory() {
        let dir = TempDir::new().unwrap();
        let _storage = open_storage(&dir);
        assert!(dir.path().join("mem").is_dir());
    }

    #[test]
    fn replace_then_select_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut storage = open_storage(&dir);

        storage.replace(b"key-1", b"value-1").unwrap();
        storage.replace(b"key-1", b"value-2").unwrap();

        let mut out = Vec::new();
        storage.select(b"key-1", Some(&mut out)).unwrap();
        assert_eq!(out, b"value-2");

        // Existence check without value retrieval.
        storage.select(b"key-1", None).unwrap();
    }

    #[test]
    fn select_and_remove_of_a_missing_key_fail() {
        let dir = TempDir::new().unwrap();
        let mut storage = open_storage(&dir);

        assert!(matches!(
            storage.select(b"absent", None),
            Err(BenchError::Storage { op: "select", .. })
        ));
        assert!(matches!(
            storage.remove(b"absent"),
            Err(BenchError::Storage { op: "remove", .. })
        ));
    }

    #[test]
    fn remove_deletes_the_key() {
        let dir = TempDir::new().unwrap();
        let mut storage = open_storage(&dir);

        storage.replace(b"key", b"val").unwrap();
        storage.remove(b"key").unwrap();
        assert!(storage.select(b"key", None).is_err());
    }
}

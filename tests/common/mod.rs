#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use degstore::storage::{
    store::MemoryStore, ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError,
    StoreKey, StoreKeys, StoreKeysPrefixes, StorePrefix, WritableStorageTraits,
};

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A memory store whose writes start failing after a number of successful `set` calls.
#[derive(Debug)]
pub struct FailingStore {
    pub inner: MemoryStore,
    remaining_sets: AtomicUsize,
}

impl FailingStore {
    pub fn new(successful_sets: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            remaining_sets: AtomicUsize::new(successful_sets),
        })
    }

    pub fn allow_sets(&self, successful_sets: usize) {
        self.remaining_sets.store(successful_sets, Ordering::SeqCst);
    }
}

impl ReadableStorageTraits for FailingStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        self.inner.get(key)
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        self.inner.size_key(key)
    }
}

impl WritableStorageTraits for FailingStore {
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        let allowed = self
            .remaining_sets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if allowed {
            self.inner.set(key, value)
        } else {
            Err(StorageError::IOError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no space left on device",
            )))
        }
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        self.inner.erase(key)
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        self.inner.erase_prefix(prefix)
    }
}

impl ListableStorageTraits for FailingStore {
    fn list(&self) -> Result<StoreKeys, StorageError> {
        self.inner.list()
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        self.inner.list_prefix(prefix)
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        self.inner.list_dir(prefix)
    }
}

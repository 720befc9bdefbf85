//! A storage adapter which logs function calls.

use std::sync::Arc;

use itertools::Itertools;

use crate::storage::{
    Bytes, ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey,
    StoreKeys, StoreKeysPrefixes, StorePrefix, WritableStorageTraits,
};

/// The usage log storage adapter. Logs storage method calls.
///
/// Every call is emitted as a `trace` level [`tracing`] event with the `degstore::usage_log` target.
/// It is intended to aid in debugging by revealing storage access patterns.
///
/// ### Example
/// ```rust
/// # use std::sync::Arc;
/// # use degstore::storage::store::MemoryStore;
/// # use degstore::storage::storage_adapter::usage_log::UsageLogStorageAdapter;
/// let store = Arc::new(MemoryStore::new());
/// let store = Arc::new(UsageLogStorageAdapter::new(store, "run"));
/// ```
///
/// With `RUST_LOG=degstore::usage_log=trace`, writing a study produces events like:
/// ```text
/// TRACE degstore::usage_log: set store="run" key=gsfk3v9q0a1/stats/node.json len=1093 result=Ok(())
/// TRACE degstore::usage_log: list_dir store="run" prefix=gsfk3v9q0a1/stats/__fragments/ keys=[] prefixes=[]
/// TRACE degstore::usage_log: get store="run" key=gsfk3v9q0a1/stats/node.json len=Ok(1093)
/// ```
pub struct UsageLogStorageAdapter<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    label: String,
}

impl<TStorage: ?Sized> core::fmt::Debug for UsageLogStorageAdapter<TStorage> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "usage log ({})", self.label)
    }
}

impl<TStorage: ?Sized> UsageLogStorageAdapter<TStorage> {
    /// Create a new usage log storage adapter.
    ///
    /// `label` is attached to every event so that multiple stores can be told apart.
    pub fn new(storage: Arc<TStorage>, label: impl Into<String>) -> Self {
        Self {
            storage,
            label: label.into(),
        }
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> ReadableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let result = self.storage.get(key);
        tracing::trace!(
            target: "degstore::usage_log",
            store = %self.label,
            key = %key,
            len = ?result.as_ref().map(|v| v.as_ref().map_or(0, Bytes::len)),
            "get"
        );
        result
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let result = self.storage.size_key(key);
        tracing::trace!(
            target: "degstore::usage_log",
            store = %self.label,
            key = %key,
            result = ?result,
            "size_key"
        );
        result
    }
}

impl<TStorage: ?Sized + ListableStorageTraits> ListableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn list(&self) -> Result<StoreKeys, StorageError> {
        let result = self.storage.list();
        tracing::trace!(
            target: "degstore::usage_log",
            store = %self.label,
            keys = %format!("[{}]", result.as_ref().unwrap_or(&vec![]).iter().format(", ")),
            "list"
        );
        result
    }

    fn list_prefix(&self, prefix: &StorePrefix) -> Result<StoreKeys, StorageError> {
        let result = self.storage.list_prefix(prefix);
        tracing::trace!(
            target: "degstore::usage_log",
            store = %self.label,
            prefix = %prefix,
            keys = %format!("[{}]", result.as_ref().unwrap_or(&vec![]).iter().format(", ")),
            "list_prefix"
        );
        result
    }

    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let result = self.storage.list_dir(prefix);
        tracing::trace!(
            target: "degstore::usage_log",
            store = %self.label,
            prefix = %prefix,
            keys = %result.as_ref().map_or(String::new(), |skp| format!(
                "[{}]",
                skp.keys().iter().format(", ")
            )),
            prefixes = %result.as_ref().map_or(String::new(), |skp| format!(
                "[{}]",
                skp.prefixes().iter().format(", ")
            )),
            "list_dir"
        );
        result
    }
}

impl<TStorage: ?Sized + WritableStorageTraits> WritableStorageTraits
    for UsageLogStorageAdapter<TStorage>
{
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        let result = self.storage.set(key, value);
        tracing::trace!(
            target: "degstore::usage_log",
            store = %self.label,
            key = %key,
            len = value.len(),
            result = ?result,
            "set"
        );
        result
    }

    fn erase(&self, key: &StoreKey) -> Result<(), StorageError> {
        let result = self.storage.erase(key);
        tracing::trace!(
            target: "degstore::usage_log",
            store = %self.label,
            key = %key,
            result = ?result,
            "erase"
        );
        result
    }

    fn erase_values(&self, keys: &[StoreKey]) -> Result<(), StorageError> {
        let result = self.storage.erase_values(keys);
        tracing::trace!(
            target: "degstore::usage_log",
            store = %self.label,
            keys = %format!("[{}]", keys.iter().format(", ")),
            result = ?result,
            "erase_values"
        );
        result
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        let result = self.storage.erase_prefix(prefix);
        tracing::trace!(
            target: "degstore::usage_log",
            store = %self.label,
            prefix = %prefix,
            result = ?result,
            "erase_prefix"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::MemoryStore;
    use std::error::Error;

    #[test]
    fn usage_log_passes_through() -> Result<(), Box<dyn Error>> {
        let store = Arc::new(MemoryStore::new());
        let log = UsageLogStorageAdapter::new(store.clone(), "test");
        log.set(&"a/b".try_into()?, &[1, 2, 3])?;
        assert_eq!(store.get(&"a/b".try_into()?)?.unwrap(), &[1, 2, 3]);
        assert_eq!(log.get(&"a/b".try_into()?)?.unwrap(), &[1, 2, 3]);
        assert_eq!(log.list_dir(&"a/".try_into()?)?.keys().len(), 1);
        log.erase_prefix(&StorePrefix::root())?;
        assert!(log.list()?.is_empty());
        assert_eq!(format!("{log:?}"), "usage log (test)");
        Ok(())
    }
}

//! Array fragments.
//!
//! Every write to an array lands in a new fragment `<array>/__fragments/<seq>/`.
//! A fragment becomes visible only when its `__commit` marker is written, which happens after all of its data keys.
//! A [`FragmentWriter`] dropped before [`commit`](FragmentWriter::commit) erases whatever it wrote.

use serde::{Deserialize, Serialize};

use crate::{
    config::global_config,
    node::NodePath,
    storage::{
        fragment_key, fragment_prefix, fragments_prefix, ListableStorageTraits,
        ReadableStorageTraits, StorageError, StoreKey, StorePrefix, WritableStorageTraits,
        FRAGMENT_COMMIT_KEY,
    },
};

use super::{ArrayError, ArrayType};

/// The commit marker of a fragment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct FragmentCommit {
    pub array_type: ArrayType,
    pub cells: u64,
}

/// A committed fragment.
#[derive(Clone, Debug)]
pub(crate) struct Fragment {
    pub sequence: u64,
    pub prefix: StorePrefix,
    pub commit: FragmentCommit,
}

impl Fragment {
    pub fn key(&self, name: &str) -> Result<StoreKey, ArrayError> {
        Ok(fragment_key(&self.prefix, name)?)
    }
}

/// List the committed fragments of the array at `path` in sequence order.
pub(crate) fn committed_fragments<
    TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits,
>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<Vec<Fragment>, ArrayError> {
    let mut fragments = Vec::new();
    for prefix in storage.list_dir(&fragments_prefix(path))?.prefixes() {
        let Ok(sequence) = prefix.name().parse::<u64>() else {
            continue;
        };
        let commit_key = fragment_key(prefix, FRAGMENT_COMMIT_KEY)?;
        let Some(commit) = storage.get(&commit_key)? else {
            continue;
        };
        let commit: FragmentCommit = serde_json::from_slice(&commit)
            .map_err(|err| ArrayError::InvalidFragment(format!("{commit_key}: {err}")))?;
        fragments.push(Fragment {
            sequence,
            prefix: prefix.clone(),
            commit,
        });
    }
    fragments.sort_by_key(|fragment| fragment.sequence);
    Ok(fragments)
}

/// The sequence number of the next fragment of the array at `path`.
///
/// Uncommitted fragments are counted so that a new fragment never reuses their keys.
pub(crate) fn next_sequence<TStorage: ?Sized + ListableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
) -> Result<u64, StorageError> {
    Ok(storage
        .list_dir(&fragments_prefix(path))?
        .prefixes()
        .iter()
        .filter_map(|prefix| prefix.name().parse::<u64>().ok())
        .max()
        .map_or(0, |sequence| sequence + 1))
}

/// Writes the keys of one fragment.
pub(crate) struct FragmentWriter<'a, TStorage: ?Sized + WritableStorageTraits> {
    storage: &'a TStorage,
    path: &'a NodePath,
    prefix: StorePrefix,
    committed: bool,
}

impl<'a, TStorage: ?Sized + WritableStorageTraits> FragmentWriter<'a, TStorage> {
    pub fn new(storage: &'a TStorage, path: &'a NodePath, sequence: u64) -> Self {
        Self {
            storage,
            path,
            prefix: fragment_prefix(path, sequence),
            committed: false,
        }
    }

    /// Store `bytes` at `name` within the fragment.
    pub fn set(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArrayError> {
        let key = fragment_key(&self.prefix, name)?;
        self.storage.set(&key, bytes)?;
        Ok(())
    }

    /// Write the commit marker, making the fragment visible.
    pub fn commit(mut self, commit: &FragmentCommit) -> Result<(), ArrayError> {
        let key = fragment_key(&self.prefix, FRAGMENT_COMMIT_KEY)?;
        let json = serde_json::to_vec(commit)
            .map_err(|err| ArrayError::InvalidFragment(format!("{key}: {err}")))?;
        self.storage.set(&key, &json)?;
        self.committed = true;
        tracing::debug!(
            array = %self.path,
            fragment = %self.prefix,
            cells = commit.cells,
            "committed fragment"
        );
        Ok(())
    }
}

impl<TStorage: ?Sized + WritableStorageTraits> Drop for FragmentWriter<'_, TStorage> {
    fn drop(&mut self) {
        if self.committed || !global_config().erase_uncommitted_fragments() {
            return;
        }
        match self.storage.erase_prefix(&self.prefix) {
            Ok(()) => tracing::debug!(
                array = %self.path,
                fragment = %self.prefix,
                "erased uncommitted fragment"
            ),
            Err(err) => tracing::warn!(
                array = %self.path,
                fragment = %self.prefix,
                error = %err,
                "failed to erase uncommitted fragment"
            ),
        }
    }
}

use crate::models::FileId;
use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, TryLockError};

/// Resolved S3 key names, indexed by file id.
/// Cloning shares the underlying map, so the resolver and the uploader see the same entries.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    keys: Arc<DashMap<FileId, String>>,
    // Bumped by every clear. Readers hold it shared; a reset holds it exclusively until the
    // engine has forgotten its files too.
    generation: Arc<RwLock<u64>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, u64> {
        self.generation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of times the registry has been cleared.
    pub fn generation(&self) -> u64 {
        *self.read()
    }

    /// Like [`generation`](Self::generation), but `None` while a reset is in progress.
    pub fn try_generation(&self) -> Option<u64> {
        match self.generation.try_read() {
            Ok(generation) => Some(*generation),
            Err(TryLockError::Poisoned(poisoned)) => Some(*poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Records `key` for `id` unless an entry already exists.
    /// Returns the key now held for `id`; the first registration wins.
    pub fn register(&self, id: FileId, key: String) -> String {
        let _generation = self.read();
        self.insert(id, key)
    }

    /// Like [`register`](Self::register), but only while the registry is still at
    /// `generation`. Returns `None` if it was cleared in between.
    pub fn register_for(&self, generation: u64, id: FileId, key: String) -> Option<String> {
        let current = self.read();
        if *current != generation {
            return None;
        }
        Some(self.insert(id, key))
    }

    fn insert(&self, id: FileId, key: String) -> String {
        self.keys.entry(id).or_insert(key).value().clone()
    }

    pub fn get(&self, id: FileId) -> Option<String> {
        let _generation = self.read();
        self.keys.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: FileId) -> bool {
        let _generation = self.read();
        self.keys.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        let _generation = self.read();
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every entry, ordered by file id.
    pub fn entries(&self) -> Vec<(FileId, String)> {
        let _generation = self.read();
        let mut entries: Vec<(FileId, String)> = self
            .keys
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    pub fn clear(&self) {
        self.clear_then(|| ());
    }

    /// Clears the registry and runs `f` before any reader or registration gets through again.
    ///
    /// `f` must not call back into this registry.
    pub fn clear_then<R>(&self, f: impl FnOnce() -> R) -> R {
        let mut generation = self
            .generation
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *generation += 1;
        self.keys.clear();
        f()
    }
}

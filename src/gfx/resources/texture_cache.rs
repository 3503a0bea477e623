//! Per-load texture de-duplication.
//!
//! Meshes of one model often reference the same image file. The cache keys
//! textures by their lexically normalised path and hands out shared `Arc`s,
//! so each file is decoded and uploaded once per loading session.

use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

pub struct TextureCache<T> {
    entries: HashMap<PathBuf, Arc<T>>,
    hits: usize,
}

impl<T> TextureCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
        }
    }

    /// Returns the cached value for `path`, or runs `load` and caches its
    /// result. Failed loads are not cached.
    pub fn get_or_load<E>(
        &mut self,
        path: &Path,
        load: impl FnOnce(&Path) -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        let key = normalize_path(path);
        if let Some(existing) = self.entries.get(&key) {
            self.hits += 1;
            log::trace!("Texture '{}' already loaded", key.display());
            return Ok(Arc::clone(existing));
        }

        let value = Arc::new(load(&key)?);
        self.entries.insert(key, Arc::clone(&value));
        Ok(value)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes `.` components and folds `..` into the preceding component
/// without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

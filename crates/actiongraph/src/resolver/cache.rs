//! Registry cache owned by a resolver.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::registry::{RegistryResult, SelectorRegistry};

/// Loaded registries keyed by path.
///
/// The default registry and any per-call override paths are loaded once and
/// shared as `Arc`s until [`RegistryCache::reload`] or
/// [`RegistryCache::invalidate`] is called.
#[derive(Debug)]
pub struct RegistryCache {
    default_path: PathBuf,
    loaded: Mutex<HashMap<PathBuf, Arc<SelectorRegistry>>>,
}

impl RegistryCache {
    /// Cache for the registry at `path`; nothing is read until first use
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: path.into(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Cache pre-seeded with an in-memory registry under `path`
    #[must_use]
    pub fn with_registry(path: impl Into<PathBuf>, registry: SelectorRegistry) -> Self {
        let cache = Self::new(path);
        cache.insert(cache.default_path.clone(), registry);
        cache
    }

    /// Path of the default registry
    #[must_use]
    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    /// Registry for `override_path`, else the default one
    pub fn get(&self, override_path: Option<&Path>) -> RegistryResult<Arc<SelectorRegistry>> {
        let path = override_path.unwrap_or(&self.default_path);
        if let Some(registry) = self.lock().get(path) {
            return Ok(Arc::clone(registry));
        }
        let registry = SelectorRegistry::load(path)?;
        tracing::debug!(path = %path.display(), selectors = registry.len(), "registry loaded");
        Ok(self.insert(path.to_path_buf(), registry))
    }

    /// Re-read the default registry from disk and drop every override
    pub fn reload(&self) -> RegistryResult<Arc<SelectorRegistry>> {
        let registry = SelectorRegistry::load(&self.default_path)?;
        self.lock().clear();
        Ok(self.insert(self.default_path.clone(), registry))
    }

    /// Replace the cached default registry (after a drift apply, say)
    pub fn replace(&self, registry: SelectorRegistry) -> Arc<SelectorRegistry> {
        self.insert(self.default_path.clone(), registry)
    }

    /// Forget everything; the next lookup reads from disk
    pub fn invalidate(&self) {
        self.lock().clear();
    }

    fn insert(&self, path: PathBuf, registry: SelectorRegistry) -> Arc<SelectorRegistry> {
        let registry = Arc::new(registry);
        self.lock().insert(path, Arc::clone(&registry));
        registry
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<SelectorRegistry>>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

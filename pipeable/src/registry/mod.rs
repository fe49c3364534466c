//! Stage registry for discovering and loading stage implementations.
//!
//! The registry is an explicit table from `(host, name)` to a descriptor and
//! factory, built at process start. Lookups are exact: a stage registered for
//! one host is never served for another.

use crate::core::{StageCategory, StageDescriptor};
use crate::errors::{DuplicateStageError, StageNotFoundError};
use crate::stages::{self, DescribedStage, Stage, StageInstance};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Factory function type for creating stages.
pub type StageFactory = Arc<dyn Fn() -> Box<dyn Stage> + Send + Sync>;

/// A registered stage type.
#[derive(Clone)]
pub struct LoadedStage {
    descriptor: Arc<StageDescriptor>,
    factory: StageFactory,
}

impl LoadedStage {
    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<StageDescriptor> {
        &self.descriptor
    }

    /// Creates a fresh, unconfigured instance.
    #[must_use]
    pub fn instantiate(&self) -> StageInstance {
        StageInstance::new(self.descriptor.clone(), (self.factory)())
    }
}

impl std::fmt::Debug for LoadedStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedStage")
            .field("host", &self.descriptor.host)
            .field("name", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}

/// Registry of stage descriptors and factories keyed by host and name.
#[derive(Default)]
pub struct StageRegistry {
    entries: RwLock<BTreeMap<(String, String), LoadedStage>>,
}

impl StageRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in `"system"` stages.
    #[must_use]
    pub fn with_system_stages() -> Self {
        let registry = Self::new();
        // A fresh registry cannot already hold these names.
        let _ = stages::system::register_all(&registry);
        registry
    }

    /// Registers a stage type by its static descriptor.
    pub fn register<S: DescribedStage>(&self) -> Result<(), DuplicateStageError> {
        let factory: StageFactory = Arc::new(|| Box::new(S::default()) as Box<dyn Stage>);
        self.register_factory(S::descriptor(), factory)
    }

    /// Registers a descriptor with an explicit factory.
    pub fn register_factory(
        &self,
        descriptor: StageDescriptor,
        factory: StageFactory,
    ) -> Result<(), DuplicateStageError> {
        let key = (descriptor.host.clone(), descriptor.name.clone());
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(DuplicateStageError::new(key.0, key.1));
        }

        debug!(host = %key.0, stage = %key.1, category = %descriptor.category, "Stage registered");
        entries.insert(
            key,
            LoadedStage {
                descriptor: Arc::new(descriptor),
                factory,
            },
        );
        Ok(())
    }

    /// Lists descriptors for `host` in `category`, ordered by name.
    #[must_use]
    pub fn discover(&self, host: &str, category: StageCategory) -> Vec<Arc<StageDescriptor>> {
        self.entries
            .read()
            .iter()
            .filter(|((h, _), entry)| h == host && entry.descriptor.category == category)
            .map(|(_, entry)| entry.descriptor.clone())
            .collect()
    }

    /// Lists every descriptor registered for `host`, ordered by name.
    #[must_use]
    pub fn discover_all(&self, host: &str) -> Vec<Arc<StageDescriptor>> {
        self.entries
            .read()
            .iter()
            .filter(|((h, _), _)| h == host)
            .map(|(_, entry)| entry.descriptor.clone())
            .collect()
    }

    /// Returns the descriptor without instantiating the stage.
    pub fn describe(&self, host: &str, name: &str) -> Result<Arc<StageDescriptor>, StageNotFoundError> {
        self.load(host, name).map(|loaded| loaded.descriptor)
    }

    /// Loads a stage type for instantiation.
    ///
    /// Never returns a placeholder; see [`DisabledStage`](crate::stages::DisabledStage).
    pub fn load(&self, host: &str, name: &str) -> Result<LoadedStage, StageNotFoundError> {
        self.entries
            .read()
            .get(&(host.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StageNotFoundError::new(host, name))
    }

    /// Returns true if a stage is registered under `host`/`name`.
    #[must_use]
    pub fn contains(&self, host: &str, name: &str) -> bool {
        self.entries
            .read()
            .contains_key(&(host.to_string(), name.to_string()))
    }

    /// Lists the hosts with at least one registered stage.
    #[must_use]
    pub fn hosts(&self) -> Vec<String> {
        self.entries
            .read()
            .keys()
            .map(|(host, _)| host.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stage_count", &self.len())
            .field("hosts", &self.hosts())
            .finish()
    }
}

use std::collections::BTreeMap;

use twe_schemas::StrategyType;

use crate::manager::StrategyFactory;
use crate::traits::Strategy;

#[derive(Debug, Clone)]
pub struct StrategyMeta {
    pub name: String,
    pub strategy_type: StrategyType,
    pub description: String,
}

#[derive(Debug)]
pub enum RegistryError {
    AlreadyRegistered(String),
    NotFound(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::AlreadyRegistered(name) => write!(f, "strategy {name:?} is already registered"),
            RegistryError::NotFound(name) => write!(f, "no strategy registered under name {name:?}"),
        }
    }
}

impl std::error::Error for RegistryError {}

struct Entry {
    meta: StrategyMeta,
    factory: StrategyFactory,
}

/// Catalog of every buildable strategy, keyed by stable name. `StrategyManager`
/// consumes this to resolve the factory behind a name at swap time; the
/// catalog itself holds no live `Strategy` instances.
#[derive(Default)]
pub struct PluginRegistry {
    entries: BTreeMap<String, Entry>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        meta: StrategyMeta,
        factory: StrategyFactory,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(&meta.name) {
            return Err(RegistryError::AlreadyRegistered(meta.name));
        }
        self.entries.insert(meta.name.clone(), Entry { meta, factory });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn list(&self) -> Vec<&StrategyMeta> {
        self.entries.values().map(|e| &e.meta).collect()
    }

    pub fn meta(&self, name: &str) -> Option<&StrategyMeta> {
        self.entries.get(name).map(|e| &e.meta)
    }

    pub fn instantiate(&self, name: &str) -> Result<Box<dyn Strategy>, RegistryError> {
        let entry = self.entries.get(name).ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        Ok((entry.factory)())
    }

    /// Instantiate and run `reset()` once, so the returned handle is
    /// guaranteed warm-up-clean before a caller routes its first bar.
    pub fn instantiate_verified(&self, name: &str) -> Result<Box<dyn Strategy>, RegistryError> {
        let mut strategy = self.instantiate(name)?;
        strategy.reset();
        Ok(strategy)
    }

    pub fn deregister(&mut self, name: &str) -> Result<(), RegistryError> {
        self.entries.remove(name).map(|_| ()).ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }
}

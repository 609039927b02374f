//! Process-wide grammar cache keyed by name

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use super::{GrammarHandle, load_grammar};
use crate::error::GrammarLoadError;

/// Loads each grammar once and hands out shared handles.
///
/// Only the map is locked; tables are immutable and parsed without locks.
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    grammars: RwLock<FxHashMap<SmolStr, GrammarHandle>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<GrammarHandle> {
        self.grammars.read().get(name).cloned()
    }

    /// Register a handle under its grammar name, replacing any previous one.
    pub fn insert(&self, handle: GrammarHandle) -> Option<GrammarHandle> {
        let name = SmolStr::new(handle.name());
        self.grammars.write().insert(name, handle)
    }

    /// The handle registered as `name`, loading it from `load()` bytes the
    /// first time. Concurrent first calls may both load; one result wins.
    pub fn get_or_load<F>(&self, name: &str, load: F) -> Result<GrammarHandle, GrammarLoadError>
    where
        F: FnOnce() -> Vec<u8>,
    {
        if let Some(handle) = self.get(name) {
            trace!(grammar = name, "grammar registry hit");
            return Ok(handle);
        }
        let handle = load_grammar(&load())?;
        let mut grammars = self.grammars.write();
        let handle = grammars.entry(SmolStr::new(name)).or_insert(handle).clone();
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.grammars.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.read().is_empty()
    }
}

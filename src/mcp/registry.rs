//! Name-keyed registries for tools, resource providers and prompt providers.
//!
//! Entries are kept in registration order so that provider probing
//! (`resources/read`, `prompts/get`) is deterministic for the life of the
//! process. Readers always see either the old or the new entry for a key.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;

use crate::mcp::handler::{PromptProvider, ResourceProvider, ToolHandler};

/// Registry of tool handlers, keyed by tool name.
pub type ToolRegistry = Registry<dyn ToolHandler>;

/// Registry of resource providers, keyed by a registrar-assigned name.
pub type ResourceRegistry = Registry<dyn ResourceProvider>;

/// Registry of prompt providers, keyed by a registrar-assigned name.
pub type PromptRegistry = Registry<dyn PromptProvider>;

/// Concurrent name → provider map.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: RwLock<Vec<(String, Arc<T>)>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry. `kind` is only used in log lines.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<(String, Arc<T>)>> {
        // A panicking writer cannot leave a half-built entry behind: the
        // entry is fully constructed before the lock is taken.
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<(String, Arc<T>)>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `provider` under `name`, replacing any previous entry.
    pub fn register(&self, name: impl Into<String>, provider: Arc<T>) {
        let name = name.into();
        let mut entries = self.write();
        match entries.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => {
                slot.1 = provider;
                info!("Replaced {}: {}", self.kind, name);
            }
            None => {
                info!("Registered {}: {}", self.kind, name);
                entries.push((name, provider));
            }
        }
    }

    /// Look up the provider registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.read()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, provider)| provider.clone())
    }

    /// Snapshot of every provider, in registration order.
    pub fn all(&self) -> Vec<Arc<T>> {
        self.read().iter().map(|(_, p)| p.clone()).collect()
    }

    /// Snapshot of every registered name, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.read().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|(key, _)| key == name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Registry<dyn ToolHandler> {
    /// Register a tool under its own declared name.
    pub fn register_tool<H: ToolHandler + 'static>(&self, handler: H) {
        let handler: Arc<dyn ToolHandler> = Arc::new(handler);
        self.register(handler.name(), handler);
    }
}

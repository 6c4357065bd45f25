//! Application context – holds capability trait objects.

use crate::platform::{MemoryStore, StdFilesystem, StdProcess};
use crate::traits::*;
use std::path::PathBuf;

/// Central context passed to every command execution.
///
/// Holds trait-object capabilities so front ends can swap implementations
/// (e.g. a scratch in-memory store instead of the real filesystem).
pub struct AppContext {
    store: Box<dyn ResourceStore>,
    process: Box<dyn ProcessOps>,
}

impl AppContext {
    pub fn new(store: Box<dyn ResourceStore>, process: Box<dyn ProcessOps>) -> Self {
        Self { store, process }
    }

    /// Real filesystem rooted at `root`, real process termination.
    pub fn default_platform(root: impl Into<PathBuf>) -> Self {
        Self {
            store: Box::new(StdFilesystem::new(root)),
            process: Box::new(StdProcess),
        }
    }

    /// In-memory store; nothing written survives the process.
    pub fn scratch() -> Self {
        Self {
            store: Box::new(MemoryStore::new()),
            process: Box::new(StdProcess),
        }
    }

    pub fn store(&self) -> &dyn ResourceStore {
        self.store.as_ref()
    }

    pub fn process(&self) -> &dyn ProcessOps {
        self.process.as_ref()
    }
}

//! Platform implementations of the capability traits.
//!
//! - [`StdFilesystem`]: resources are files under a root directory
//! - [`MemoryStore`]: resources live in a map, nothing touches disk
//! - [`StdProcess`]: real process termination

use crate::traits::*;
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

// ===========================================================================
// Filesystem – wraps std::fs, confined to a root directory
// ===========================================================================

pub struct StdFilesystem {
    root: PathBuf,
}

impl StdFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a resource name to a path under the root.
    ///
    /// Only plain relative names are accepted: no absolute paths, no `..`.
    fn resolve(&self, name: &str) -> StoreResult<PathBuf> {
        let rel = Path::new(name);
        let mut has_normal = false;
        for component in rel.components() {
            match component {
                Component::Normal(_) => has_normal = true,
                Component::CurDir => {}
                _ => return Err(StoreError::InvalidName(name.to_string())),
            }
        }
        if !has_normal {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

fn map_io(e: std::io::Error, action: &str, name: &str) -> StoreError {
    match e.kind() {
        ErrorKind::NotFound => StoreError::NotFound(name.to_string()),
        ErrorKind::PermissionDenied => {
            StoreError::PermissionDenied(format!("cannot {} {}: {}", action, name, e))
        }
        _ => StoreError::Io(e),
    }
}

impl ResourceStore for StdFilesystem {
    /// Replace the file through a temporary sibling and a rename, so a failed
    /// write never leaves the resource half-written.
    ///
    /// The parent directory must already exist. Creating it here would leave
    /// directories behind that an undo of this write could not account for.
    fn write(&self, name: &str, content: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let path = self.resolve(name)?;
        let prior = match std::fs::read(&path) {
            Ok(data) => Some(data),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(map_io(e, "read", name)),
        };
        let parent = path
            .parent()
            .ok_or_else(|| StoreError::InvalidName(name.to_string()))?;
        if !parent.is_dir() {
            return Err(StoreError::MissingParent(name.to_string()));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix(".retrace-");
        if prior.is_some() {
            // Keep the mode of the file being replaced
            if let Ok(meta) = std::fs::metadata(&path) {
                builder.permissions(meta.permissions());
            }
        }
        let mut staged = builder
            .tempfile_in(parent)
            .map_err(|e| map_io(e, "write", name))?;
        staged
            .write_all(content)
            .map_err(|e| map_io(e, "write", name))?;
        staged
            .persist(&path)
            .map_err(|e| map_io(e.error, "write", name))?;
        Ok(prior)
    }

    fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        let path = self.resolve(name)?;
        std::fs::read(path).map_err(|e| map_io(e, "read", name))
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        let path = self.resolve(name)?;
        std::fs::remove_file(path).map_err(|e| map_io(e, "remove", name))
    }

    fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }
}

// ===========================================================================
// In-memory store – scratch sessions and tests
// ===========================================================================

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every resource currently held.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.entries
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".into()))
    }
}

fn check_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl ResourceStore for MemoryStore {
    fn write(&self, name: &str, content: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        check_name(name)?;
        Ok(self.lock()?.insert(name.to_string(), content.to_vec()))
    }

    fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        check_name(name)?;
        self.lock()?
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        check_name(name)?;
        self.lock()?
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.entries
            .lock()
            .map(|m| m.contains_key(name))
            .unwrap_or(false)
    }
}

// ===========================================================================
// Process
// ===========================================================================

pub struct StdProcess;

impl ProcessOps for StdProcess {
    fn terminate(&self, code: i32) -> ! {
        tracing::info!(code, "terminating process");
        std::process::exit(code)
    }
}

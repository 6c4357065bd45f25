//! Capability traits – the engine's only view of the outside world.
//!
//! Commands never touch `std::fs` or `std::process` directly. They go through
//! these traits so front ends can swap implementations (real filesystem vs
//! in-memory scratch store).

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid resource name: {0}")]
    InvalidName(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("parent directory does not exist: {0}")]
    MissingParent(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Resource store
// ---------------------------------------------------------------------------

/// Minimal persistence contract the built-in commands need.
///
/// Resources are addressed by name; what a name maps to (a file under a root
/// directory, a map key) is up to the implementation.
pub trait ResourceStore: Send + Sync {
    /// Write `content` to `name`, returning what was there before.
    ///
    /// `Ok(None)` means the resource did not exist prior to this write.
    fn write(&self, name: &str, content: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Read the full content of `name`.
    fn read(&self, name: &str) -> StoreResult<Vec<u8>>;

    /// Remove `name`. Fails with [`StoreError::NotFound`] if it is missing.
    fn remove(&self, name: &str) -> StoreResult<()>;

    fn exists(&self, name: &str) -> bool;
}

impl<T: ResourceStore + ?Sized> ResourceStore for std::sync::Arc<T> {
    fn write(&self, name: &str, content: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).write(name, content)
    }

    fn read(&self, name: &str) -> StoreResult<Vec<u8>> {
        (**self).read(name)
    }

    fn remove(&self, name: &str) -> StoreResult<()> {
        (**self).remove(name)
    }

    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }
}

// ---------------------------------------------------------------------------
// Process boundary
// ---------------------------------------------------------------------------

pub trait ProcessOps: Send + Sync {
    /// End the host process. Never returns.
    fn terminate(&self, code: i32) -> !;
}

//! Engine crate – command execution with linear undo/redo history.
//!
//! Commands run against capability traits (resource store, process
//! boundary) rather than concrete OS APIs, so every front end – interactive
//! REPL, script runner, socket daemon – drives the same engine.

pub mod commands;
pub mod conductor;
pub mod context;
pub mod history;
pub mod platform;
pub mod registry;
pub mod script;
pub mod session;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use commands::{Command, CommandError, CreateCommand, DeleteCommand, ExitCommand};
pub use conductor::{Conductor, ConductorError, UndoFailurePolicy};
pub use context::AppContext;
pub use history::{History, HistoryError};
pub use registry::{CommandRegistry, Instruction, ParseError};
pub use session::Session;
pub use types::{Effect, ErrorCode, ErrorInfo, Report, Status};

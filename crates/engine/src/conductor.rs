//! Conductor – the only owner and mutator of a [`History`].
//!
//! `run` executes a new command and records it; `undo`/`redo` walk the
//! timeline by invoking the right command method at the right index.
//!
//! When an undo (or redo) side effect fails, the cursor has already moved.
//! With [`UndoFailurePolicy::KeepCursor`] it stays moved: the history treats
//! the command as undone even though the reversal failed, and the error is
//! surfaced. [`UndoFailurePolicy::RollBack`] puts the cursor back first.

use crate::commands::{Command, CommandError};
use crate::context::AppContext;
use crate::history::History;
use crate::types::{Effect, ErrorCode};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UndoFailurePolicy {
    #[default]
    KeepCursor,
    RollBack,
}

#[derive(Debug, thiserror::Error)]
pub enum ConductorError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("{0} cannot be undone")]
    NotUndoable(String),
    #[error("{command}: {source}")]
    Execution {
        command: String,
        #[source]
        source: CommandError,
    },
}

impl ConductorError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ConductorError::NothingToUndo => ErrorCode::NothingToUndo,
            ConductorError::NothingToRedo => ErrorCode::NothingToRedo,
            ConductorError::NotUndoable(_) => ErrorCode::NotUndoable,
            ConductorError::Execution { source, .. } => source.error_code(),
        }
    }

    /// Nothing to undo/redo: user-visible, but not a failure.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            ConductorError::NothingToUndo | ConductorError::NothingToRedo
        )
    }

    fn from_command(command: String, source: CommandError) -> Self {
        match source {
            CommandError::NotUndoable(what) => ConductorError::NotUndoable(what),
            source => ConductorError::Execution { command, source },
        }
    }
}

#[derive(Default)]
pub struct Conductor {
    history: History,
    policy: UndoFailurePolicy,
}

impl Conductor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: UndoFailurePolicy) -> Self {
        Self {
            history: History::new(),
            policy,
        }
    }

    /// Read-only view of the timeline.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Execute a new command; record it only if execution succeeded.
    pub fn run(
        &mut self,
        mut command: Box<dyn Command>,
        ctx: &AppContext,
    ) -> Result<Effect, ConductorError> {
        let description = command.describe();
        match command.execute(ctx) {
            Ok(effect) => {
                tracing::info!(command = %description, %effect, "executed");
                self.history.append(command);
                tracing::debug!(cursor = ?self.history.cursor(), len = self.history.len(), "history advanced");
                Ok(effect)
            }
            Err(source) => {
                tracing::warn!(command = %description, error = %source, "execution failed; not recorded");
                Err(ConductorError::from_command(description, source))
            }
        }
    }

    pub fn undo(&mut self, ctx: &AppContext) -> Result<Effect, ConductorError> {
        let command = match self.history.step_back() {
            Ok(command) => command,
            Err(_) => {
                tracing::debug!("nothing to undo");
                return Err(ConductorError::NothingToUndo);
            }
        };
        let description = command.describe();
        match command.undo(ctx) {
            Ok(effect) => {
                tracing::info!(command = %description, %effect, cursor = ?self.history.cursor(), "undone");
                Ok(effect)
            }
            Err(source) => {
                tracing::warn!(command = %description, error = %source, policy = ?self.policy, "undo failed");
                if self.policy == UndoFailurePolicy::RollBack {
                    let _ = self.history.step_forward();
                }
                Err(ConductorError::from_command(description, source))
            }
        }
    }

    pub fn redo(&mut self, ctx: &AppContext) -> Result<Effect, ConductorError> {
        let command = match self.history.step_forward() {
            Ok(command) => command,
            Err(_) => {
                tracing::debug!("nothing to redo");
                return Err(ConductorError::NothingToRedo);
            }
        };
        let description = command.describe();
        match command.execute(ctx) {
            Ok(effect) => {
                tracing::info!(command = %description, %effect, cursor = ?self.history.cursor(), "redone");
                Ok(effect)
            }
            Err(source) => {
                tracing::warn!(command = %description, error = %source, policy = ?self.policy, "redo failed");
                if self.policy == UndoFailurePolicy::RollBack {
                    let _ = self.history.step_back();
                }
                Err(ConductorError::from_command(description, source))
            }
        }
    }

    /// Render the timeline, oldest first, with `>` on the current entry.
    pub fn render_history(&self) -> String {
        if self.history.is_empty() {
            return "history is empty".to_string();
        }
        let mut out = String::new();
        if self.history.cursor().is_none() {
            out.push_str(">   -  (nothing applied)\n");
        }
        for entry in self.history.entries() {
            let marker = if entry.is_current { '>' } else { ' ' };
            let _ = writeln!(
                out,
                "{} {:>3}  {}",
                marker,
                entry.index,
                entry.command.describe()
            );
        }
        out.pop();
        out
    }
}

// ===========================================================================
// Tests
// ===========================================================================

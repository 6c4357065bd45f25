//! Command trait and the built-in command variants.
//!
//! A command is one unit of work with a forward (`execute`) and a backward
//! (`undo`) effect. Anything the backward effect needs from the outside world
//! is captured during `execute`, never at construction or undo time.

use crate::context::AppContext;
use crate::traits::StoreError;
use crate::types::{Effect, ErrorCode};
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0} cannot be undone")]
    NotUndoable(String),
    #[error("{0} has not been executed")]
    NotExecuted(String),
}

impl CommandError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            CommandError::InvalidInput(_) => ErrorCode::InvalidInput,
            CommandError::Store(e) => match e {
                StoreError::InvalidName(_) => ErrorCode::InvalidInput,
                StoreError::NotFound(_) | StoreError::MissingParent(_) => ErrorCode::NotFound,
                StoreError::PermissionDenied(_) => ErrorCode::PermissionDenied,
                StoreError::Io(_) => ErrorCode::IoError,
                StoreError::Other(_) => ErrorCode::InternalError,
            },
            CommandError::NotUndoable(_) => ErrorCode::NotUndoable,
            CommandError::NotExecuted(_) => ErrorCode::InternalError,
        }
    }
}

/// A reversible (or explicitly irreversible) unit of work.
///
/// Only the [`Conductor`](crate::conductor::Conductor) calls `execute` and
/// `undo`, and it guarantees they alternate: a command may go through any
/// number of execute/undo cycles via redo and undo.
pub trait Command: Send {
    /// Variant name, as typed at the prompt.
    fn name(&self) -> &'static str;

    /// One-line description for history listings.
    fn describe(&self) -> String;

    fn execute(&mut self, ctx: &AppContext) -> Result<Effect, CommandError>;

    fn undo(&mut self, ctx: &AppContext) -> Result<Effect, CommandError>;
}

impl fmt::Debug for dyn Command + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// State of a resource as seen right before a command touched it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Prior {
    Absent,
    Content(Vec<u8>),
}

fn preview(text: &str) -> String {
    const MAX: usize = 32;
    if text.chars().count() <= MAX {
        format!("{:?}", text)
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{:?}…", cut)
    }
}

// ===========================================================================
// create
// ===========================================================================

/// `create <name> <text...>` – create or overwrite a resource.
#[derive(Debug)]
pub struct CreateCommand {
    name: String,
    content: String,
    prior: Option<Prior>,
}

impl CreateCommand {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            prior: None,
        }
    }
}

impl Command for CreateCommand {
    fn name(&self) -> &'static str {
        "create"
    }

    fn describe(&self) -> String {
        format!("create {} {}", self.name, preview(&self.content))
    }

    fn execute(&mut self, ctx: &AppContext) -> Result<Effect, CommandError> {
        let previous = ctx.store().write(&self.name, self.content.as_bytes())?;
        let replaced = previous.is_some();
        self.prior = Some(match previous {
            Some(data) => Prior::Content(data),
            None => Prior::Absent,
        });
        tracing::debug!(name = %self.name, replaced, "create executed");
        Ok(Effect::Wrote {
            name: self.name.clone(),
            bytes: self.content.len(),
            replaced,
        })
    }

    fn undo(&mut self, ctx: &AppContext) -> Result<Effect, CommandError> {
        let effect = match &self.prior {
            None => return Err(CommandError::NotExecuted(self.describe())),
            Some(Prior::Absent) => {
                ctx.store().remove(&self.name)?;
                Effect::Removed {
                    name: self.name.clone(),
                }
            }
            Some(Prior::Content(data)) => {
                ctx.store().write(&self.name, data)?;
                Effect::Restored {
                    name: self.name.clone(),
                    bytes: data.len(),
                }
            }
        };
        self.prior = None;
        Ok(effect)
    }
}

// ===========================================================================
// delete
// ===========================================================================

/// `delete <name>` – remove a resource, keeping its content for undo.
#[derive(Debug)]
pub struct DeleteCommand {
    name: String,
    captured: Option<Vec<u8>>,
}

impl DeleteCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            captured: None,
        }
    }
}

impl Command for DeleteCommand {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn describe(&self) -> String {
        format!("delete {}", self.name)
    }

    fn execute(&mut self, ctx: &AppContext) -> Result<Effect, CommandError> {
        let data = ctx.store().read(&self.name)?;
        ctx.store().remove(&self.name)?;
        self.captured = Some(data);
        Ok(Effect::Removed {
            name: self.name.clone(),
        })
    }

    fn undo(&mut self, ctx: &AppContext) -> Result<Effect, CommandError> {
        let data = self
            .captured
            .as_ref()
            .ok_or_else(|| CommandError::NotExecuted(self.describe()))?;
        ctx.store().write(&self.name, data)?;
        let bytes = data.len();
        self.captured = None;
        Ok(Effect::Restored {
            name: self.name.clone(),
            bytes,
        })
    }
}

// ===========================================================================
// exit
// ===========================================================================

/// `exit` – ask the front end to end the process.
///
/// Execution only signals termination; the front end owns the actual exit.
#[derive(Debug, Default)]
pub struct ExitCommand {
    code: i32,
}

impl ExitCommand {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn describe(&self) -> String {
        "exit".to_string()
    }

    fn execute(&mut self, _ctx: &AppContext) -> Result<Effect, CommandError> {
        Ok(Effect::Terminate { code: self.code })
    }

    fn undo(&mut self, _ctx: &AppContext) -> Result<Effect, CommandError> {
        Err(CommandError::NotUndoable(self.describe()))
    }
}

// ===========================================================================
// Tests
// ===========================================================================

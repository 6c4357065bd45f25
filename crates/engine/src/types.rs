use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Effects – what a command actually did to the outside world
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// Content written; `replaced` is true when the resource already existed.
    Wrote {
        name: String,
        bytes: usize,
        replaced: bool,
    },
    /// Captured content written back over the resource.
    Restored { name: String, bytes: usize },
    Removed { name: String },
    /// The host process should end with `code`.
    Terminate { code: i32 },
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Wrote {
                name,
                bytes,
                replaced: false,
            } => write!(f, "created {} ({} bytes)", name, bytes),
            Effect::Wrote {
                name,
                bytes,
                replaced: true,
            } => write!(f, "overwrote {} ({} bytes)", name, bytes),
            Effect::Restored { name, bytes } => write!(f, "restored {} ({} bytes)", name, bytes),
            Effect::Removed { name } => write!(f, "removed {}", name),
            Effect::Terminate { code } => write!(f, "exiting with code {}", code),
        }
    }
}

// ---------------------------------------------------------------------------
// Report JSON – the stable output contract for every front end
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: String,
    /// The raw input line this report answers.
    pub instruction: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<Effect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub timing_ms: u64,
}

impl Report {
    /// Exit code requested by the instruction, if it was an exit.
    pub fn terminate_code(&self) -> Option<i32> {
        match self.effect {
            Some(Effect::Terminate { code }) => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Fail,
    Skip,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    CommandNotFound,
    NothingToUndo,
    NothingToRedo,
    NotUndoable,
    NotFound,
    PermissionDenied,
    IoError,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        f.write_str(&s)
    }
}

// ---------------------------------------------------------------------------
// Script types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptStep {
    pub line: String,
    #[serde(default = "default_expect_status")]
    pub expect_status: Status,
}

fn default_expect_status() -> Status {
    Status::Pass
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptResult {
    pub name: Option<String>,
    pub overall_status: Status,
    pub step_results: Vec<Report>,
}

// ---------------------------------------------------------------------------
// Serve / daemon protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub id: String,
    pub line: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Generate a new run ID (UUIDv4).
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Build a passing Report (caller fills in effect or message).
pub fn report_ok(instruction: &str, run_id: &str, total_ms: u64) -> Report {
    Report {
        run_id: run_id.to_string(),
        instruction: instruction.to_string(),
        status: Status::Pass,
        message: String::new(),
        effect: None,
        error: None,
        timing_ms: total_ms,
    }
}

/// Build a Report for a benign no-op (nothing to undo, empty line, ...).
pub fn report_skip(
    instruction: &str,
    run_id: &str,
    total_ms: u64,
    message: impl Into<String>,
) -> Report {
    Report {
        status: Status::Skip,
        message: message.into(),
        ..report_ok(instruction, run_id, total_ms)
    }
}

/// Build an error Report.
pub fn report_err(
    instruction: &str,
    run_id: &str,
    total_ms: u64,
    code: ErrorCode,
    message: impl Into<String>,
) -> Report {
    Report {
        status: Status::Error,
        error: Some(ErrorInfo {
            code,
            message: message.into(),
        }),
        ..report_ok(instruction, run_id, total_ms)
    }
}

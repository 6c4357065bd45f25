//! Command registry – turns an input line into an [`Instruction`].
//!
//! Recorded commands are registered by name with a builder; the control words
//! (`undo`, `redo`, `history`, `help`) map straight to conductor operations and
//! never produce a command.

use crate::commands::{Command, CreateCommand, DeleteCommand, ExitCommand};
use crate::types::ErrorCode;
use std::collections::BTreeMap;

/// Builds a command from everything after the command word.
pub type CommandBuilder = fn(&str) -> Result<Box<dyn Command>, ParseError>;

pub const CONTROL_WORDS: [&str; 4] = ["undo", "redo", "history", "help"];

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{0} command not found!")]
    NotFound(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl ParseError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ParseError::NotFound(_) => ErrorCode::CommandNotFound,
            ParseError::Usage(_) => ErrorCode::InvalidInput,
        }
    }
}

/// What one input line asks for.
pub enum Instruction {
    Run(Box<dyn Command>),
    Undo,
    Redo,
    History,
    Help,
    Empty,
}

struct Registration {
    usage: &'static str,
    build: CommandBuilder,
}

pub struct CommandRegistry {
    builders: BTreeMap<String, Registration>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            builders: BTreeMap::new(),
        };
        // Register built-in commands
        reg.register("create", "create <name> <text...>", build_create);
        reg.register("delete", "delete <name>", build_delete);
        reg.register("exit", "exit", build_exit);
        reg
    }

    /// Control words are reserved; registering one is ignored.
    pub fn register(&mut self, name: &str, usage: &'static str, build: CommandBuilder) {
        if CONTROL_WORDS.contains(&name) {
            tracing::warn!(name, "refusing to register a control word as a command");
            return;
        }
        self.builders
            .insert(name.to_string(), Registration { usage, build });
    }

    pub fn list(&self) -> Vec<&str> {
        self.builders.keys().map(|s| s.as_str()).collect()
    }

    /// One-line summary printed when a front end starts.
    pub fn banner(&self) -> String {
        self.builders
            .values()
            .map(|r| r.usage)
            .chain(CONTROL_WORDS)
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn help(&self) -> String {
        let mut lines: Vec<String> = self
            .builders
            .values()
            .map(|r| format!("  {}", r.usage))
            .collect();
        lines.push("  undo       revert the current command".into());
        lines.push("  redo       re-apply the next undone command".into());
        lines.push("  history    list the timeline, > marks the current entry".into());
        lines.push("  help       show this list".into());
        lines.join("\n")
    }

    /// Parse one line. The text after the command name is split on single
    /// spaces, so `create a.txt  two  spaces` keeps its inner spacing.
    pub fn parse(&self, line: &str) -> Result<Instruction, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']).trim_start();
        if line.trim().is_empty() {
            return Ok(Instruction::Empty);
        }
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));

        match word {
            "undo" => Ok(Instruction::Undo),
            "redo" => Ok(Instruction::Redo),
            "history" => Ok(Instruction::History),
            "help" => Ok(Instruction::Help),
            _ => {
                let reg = self
                    .builders
                    .get(word)
                    .ok_or_else(|| ParseError::NotFound(word.to_string()))?;
                (reg.build)(rest).map(Instruction::Run)
            }
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Built-in builders
// ===========================================================================

fn build_create(args: &str) -> Result<Box<dyn Command>, ParseError> {
    let (name, text) = args.split_once(' ').unwrap_or((args, ""));
    if name.is_empty() {
        return Err(ParseError::Usage("create <name> <text...>"));
    }
    Ok(Box::new(CreateCommand::new(name, text)))
}

fn build_delete(args: &str) -> Result<Box<dyn Command>, ParseError> {
    let name = args
        .split_whitespace()
        .next()
        .ok_or(ParseError::Usage("delete <name>"))?;
    Ok(Box::new(DeleteCommand::new(name)))
}

fn build_exit(_args: &str) -> Result<Box<dyn Command>, ParseError> {
    Ok(Box::new(ExitCommand::new()))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run_description(reg: &CommandRegistry, line: &str) -> String {
        match reg.parse(line) {
            Ok(Instruction::Run(cmd)) => cmd.describe(),
            Ok(_) => panic!("{line:?} did not parse to a command"),
            Err(e) => panic!("{line:?} failed: {e}"),
        }
    }

    #[test]
    fn parses_create_with_text() {
        let reg = CommandRegistry::new();
        assert_eq!(
            run_description(&reg, "create notes.txt hello world\n"),
            "create notes.txt \"hello world\""
        );
    }

    #[test]
    fn create_keeps_inner_spacing_and_allows_empty_text() {
        let reg = CommandRegistry::new();
        assert_eq!(
            run_description(&reg, "create a.txt two  spaces"),
            "create a.txt \"two  spaces\""
        );
        assert_eq!(run_description(&reg, "create a.txt"), "create a.txt \"\"");
    }

    #[test]
    fn create_without_name_is_usage_error() {
        let reg = CommandRegistry::new();
        let err = reg.parse("create").err().unwrap();
        assert!(matches!(err, ParseError::Usage(_)));
        assert_eq!(err.error_code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn control_words_map_to_instructions() {
        let reg = CommandRegistry::new();
        assert!(matches!(reg.parse("undo"), Ok(Instruction::Undo)));
        assert!(matches!(reg.parse("redo"), Ok(Instruction::Redo)));
        assert!(matches!(reg.parse("history"), Ok(Instruction::History)));
        assert!(matches!(reg.parse("help"), Ok(Instruction::Help)));
        assert!(matches!(reg.parse("   \n"), Ok(Instruction::Empty)));
    }

    #[test]
    fn exit_and_delete_build_commands() {
        let reg = CommandRegistry::new();
        assert_eq!(run_description(&reg, "exit"), "exit");
        assert_eq!(run_description(&reg, "delete old.txt"), "delete old.txt");
        assert!(matches!(
            reg.parse("delete").err().unwrap(),
            ParseError::Usage(_)
        ));
    }

    #[test]
    fn unknown_command_is_not_found() {
        let reg = CommandRegistry::new();
        let err = reg.parse("launch rockets").err().unwrap();
        assert_eq!(err.to_string(), "launch command not found!");
        assert_eq!(err.error_code(), ErrorCode::CommandNotFound);
    }

    #[test]
    fn control_words_cannot_be_registered() {
        let mut reg = CommandRegistry::new();
        reg.register("undo", "undo <anything>", build_exit);
        assert!(!reg.list().contains(&"undo"));
        assert!(matches!(reg.parse("undo"), Ok(Instruction::Undo)));
    }

    #[test]
    fn banner_lists_commands_and_control_words() {
        let reg = CommandRegistry::new();
        assert_eq!(
            reg.banner(),
            "create <name> <text...> | delete <name> | exit | undo | redo | history | help"
        );
        assert_eq!(reg.list(), vec!["create", "delete", "exit"]);
    }
}

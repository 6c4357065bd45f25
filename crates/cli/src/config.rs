use config::{Config, ConfigError, Environment, File};
use engine::UndoFailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub workspace: WorkspaceConfig,
    pub repl: ReplConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory that `create`/`delete` resolve resource names against.
    pub root: PathBuf,
    /// Keep resources in memory instead of on disk.
    pub scratch: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            scratch: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplConfig {
    pub prompt: String,
    pub banner: bool,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: "retrace".to_string(),
            banner: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub undo_failure: UndoFailurePolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set.
    pub level: String,
    pub json: bool,
    pub show_time: bool,
    pub show_file: bool,
    pub show_line: bool,
    pub redaction: RedactionConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            show_time: true,
            show_file: false,
            show_line: false,
            redaction: RedactionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedactionConfig {
    pub enabled: bool,
    pub patterns: Vec<RedactionPattern>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedactionPattern {
    pub name: String,
    pub regex: String,
    pub placeholder: String,
}

/// Load configuration, later sources winning:
/// defaults, `retrace.yaml`, `.retrace.yaml`, `explicit`, `RETRACE__*` env vars.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::with_name("retrace").required(false))
        // Local override, usually git-ignored
        .add_source(File::with_name(".retrace").required(false));

    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder
        .add_source(
            Environment::with_prefix("RETRACE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_defaults_without_files() {
        let config = load_config(None).unwrap();
        assert_eq!(config.workspace.root, PathBuf::from("."));
        assert!(!config.workspace.scratch);
        assert_eq!(config.repl.prompt, "retrace");
        assert_eq!(config.engine.undo_failure, UndoFailurePolicy::KeepCursor);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    #[serial]
    fn test_explicit_file_overrides_defaults() {
        let file = yaml_file(
            r#"
workspace:
  root: /tmp/retrace-work
engine:
  undo_failure: roll-back
logging:
  level: debug
  redaction:
    patterns:
      - name: token
        regex: "tok_[a-z0-9]+"
        placeholder: "[TOKEN]"
"#,
        );
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.workspace.root, PathBuf::from("/tmp/retrace-work"));
        assert_eq!(config.engine.undo_failure, UndoFailurePolicy::RollBack);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.redaction.patterns.len(), 1);
        // Untouched sections keep their defaults.
        assert!(config.repl.banner);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        let missing = Path::new("/definitely/not/here/retrace.yaml");
        assert!(load_config(Some(missing)).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = yaml_file("workspace:\n  scratch: false\n");
        std::env::set_var("RETRACE__WORKSPACE__SCRATCH", "true");
        let config = load_config(Some(file.path()));
        std::env::remove_var("RETRACE__WORKSPACE__SCRATCH");

        assert!(config.unwrap().workspace.scratch);
    }
}

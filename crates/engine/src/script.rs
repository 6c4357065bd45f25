//! Script runner – replay scripted input lines from YAML files.

use crate::session::Session;
use crate::types::*;

/// Load a script from a YAML string.
///
/// A step can expect `pass`, `skip` or `error`. `fail` only ever describes a
/// whole script run, so a step expecting it is rejected here.
pub fn load_script(yaml: &str) -> Result<Script, String> {
    let script: Script =
        serde_yaml::from_str(yaml).map_err(|e| format!("failed to parse script YAML: {}", e))?;
    if let Some(i) = script
        .steps
        .iter()
        .position(|s| s.expect_status == Status::Fail)
    {
        return Err(format!(
            "step {}: expect_status `fail` is not a step outcome (use pass, skip or error)",
            i
        ));
    }
    Ok(script)
}

/// Execute every step through `session` and return the overall result.
///
/// An `exit` step ends the script; later steps are not run.
pub fn run_script(script: &Script, session: &mut Session) -> ScriptResult {
    let mut step_results = Vec::new();
    let mut overall = Status::Pass;

    for (i, step) in script.steps.iter().enumerate() {
        let r = session.handle_line(&step.line);
        if r.status != step.expect_status {
            tracing::warn!(
                step = i,
                line = %step.line,
                expected = ?step.expect_status,
                actual = ?r.status,
                "script step status mismatch"
            );
            overall = Status::Fail;
        }
        let stop = r.terminate_code().is_some();
        step_results.push(r);
        if stop {
            tracing::info!(step = i, "script stopped at exit");
            break;
        }
    }

    ScriptResult {
        name: script.name.clone(),
        overall_status: overall,
        step_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppContext;
    use crate::platform::{MemoryStore, StdProcess};
    use std::sync::Arc;

    fn session() -> (Arc<MemoryStore>, Session) {
        let store = Arc::new(MemoryStore::new());
        let ctx = AppContext::new(Box::new(store.clone()), Box::new(StdProcess));
        (store, Session::new(ctx))
    }

    #[test]
    fn test_parse_script() {
        let yaml = r#"
name: basic flow
steps:
  - line: "create a.txt hello"
  - line: "undo"
    expect_status: pass
  - line: "undo"
    expect_status: skip
"#;
        let s = load_script(yaml).expect("should parse");
        assert_eq!(s.name, Some("basic flow".into()));
        assert_eq!(s.steps.len(), 3);
        assert_eq!(s.steps[0].expect_status, Status::Pass);
        assert_eq!(s.steps[2].expect_status, Status::Skip);
    }

    #[test]
    fn test_parse_script_rejects_unknown_status() {
        let yaml = r#"
steps:
  - line: "undo"
    expect_status: maybe
"#;
        assert!(load_script(yaml).is_err());
    }

    #[test]
    fn test_parse_script_rejects_fail_step() {
        let yaml = r#"
steps:
  - line: "create a.txt x"
  - line: "bogus"
    expect_status: fail
"#;
        let err = load_script(yaml).unwrap_err();
        assert!(err.starts_with("step 1:"), "{err}");
    }

    #[test]
    fn test_run_script_truncation_flow() {
        let yaml = r#"
steps:
  - line: "create a A"
  - line: "create b B"
  - line: "create c C"
  - line: "undo"
  - line: "create d D"
  - line: "redo"
    expect_status: skip
"#;
        let script = load_script(yaml).unwrap();
        let (store, mut session) = session();
        let result = run_script(&script, &mut session);

        assert_eq!(result.overall_status, Status::Pass);
        assert_eq!(result.step_results.len(), 6);
        let names: Vec<String> = store.snapshot().keys().cloned().collect();
        assert_eq!(names, vec!["a", "b", "d"]);
    }

    #[test]
    fn test_run_script_reports_mismatch() {
        let yaml = r#"
steps:
  - line: "bogus"
"#;
        let script = load_script(yaml).unwrap();
        let (_store, mut session) = session();
        let result = run_script(&script, &mut session);
        assert_eq!(result.overall_status, Status::Fail);
        assert_eq!(result.step_results[0].status, Status::Error);
    }

    #[test]
    fn test_run_script_stops_at_exit() {
        let yaml = r#"
steps:
  - line: "exit"
  - line: "create never.txt x"
"#;
        let script = load_script(yaml).unwrap();
        let (store, mut session) = session();
        let result = run_script(&script, &mut session);
        assert_eq!(result.overall_status, Status::Pass);
        assert_eq!(result.step_results.len(), 1);
        assert!(store.snapshot().is_empty());
    }
}

use crate::config::LoggingConfig;
use regex::Regex;
use std::io;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Writes to stderr, rewriting every configured pattern first.
///
/// Resource content flows through the logs (command descriptions), so
/// anything that looks like a secret is replaced before it leaves.
struct RedactingWriter<W> {
    inner: W,
    patterns: Vec<(Regex, String)>,
}

impl<W: io::Write> io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let mut redacted = s.to_string();
        for (re, replacement) in &self.patterns {
            redacted = re.replace_all(&redacted, replacement.as_str()).to_string();
        }
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter {
    patterns: Vec<(Regex, String)>,
}

impl<'a> fmt::MakeWriter<'a> for RedactingMakeWriter {
    type Writer = RedactingWriter<io::Stderr>;

    fn make_writer(&self) -> Self::Writer {
        RedactingWriter {
            inner: io::stderr(),
            patterns: self.patterns.clone(),
        }
    }
}

/// Compile the configured redaction patterns, returning the names of any
/// that failed to compile alongside the usable ones.
fn compile_patterns(config: &LoggingConfig) -> (Vec<(Regex, String)>, Vec<String>) {
    let mut patterns = Vec::new();
    let mut rejected = Vec::new();
    if config.redaction.enabled {
        for p in &config.redaction.patterns {
            match Regex::new(&p.regex) {
                Ok(re) => patterns.push((re, p.placeholder.clone())),
                Err(_) => rejected.push(p.name.clone()),
            }
        }
    }
    (patterns, rejected)
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (patterns, rejected) = compile_patterns(config);
    let make_writer = RedactingMakeWriter { patterns };

    // Use Layer::boxed() to unify the types of the branches
    let fmt_layer = match (config.json, config.show_time) {
        (true, true) => fmt::layer()
            .json()
            .with_writer(make_writer)
            .with_file(config.show_file)
            .with_line_number(config.show_line)
            .boxed(),
        (true, false) => fmt::layer()
            .json()
            .with_writer(make_writer)
            .with_file(config.show_file)
            .with_line_number(config.show_line)
            .without_time()
            .boxed(),
        (false, true) => fmt::layer()
            .with_writer(make_writer)
            .with_target(config.show_file)
            .with_file(config.show_file)
            .with_line_number(config.show_line)
            .boxed(),
        (false, false) => fmt::layer()
            .with_writer(make_writer)
            .with_target(config.show_file)
            .with_file(config.show_file)
            .with_line_number(config.show_line)
            .without_time()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    for name in rejected {
        tracing::warn!(pattern = %name, "ignoring redaction pattern with invalid regex");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedactionPattern;
    use std::io::Write;

    fn pattern(name: &str, regex: &str, placeholder: &str) -> RedactionPattern {
        RedactionPattern {
            name: name.into(),
            regex: regex.into(),
            placeholder: placeholder.into(),
        }
    }

    #[test]
    fn test_redacting_writer_replaces_matches() {
        let mut config = LoggingConfig::default();
        config.redaction.patterns = vec![pattern("token", r"tok_[a-z0-9]+", "[TOKEN]")];
        let (patterns, rejected) = compile_patterns(&config);
        assert!(rejected.is_empty());

        let mut writer = RedactingWriter {
            inner: Vec::new(),
            patterns,
        };
        let line = b"create a.txt tok_abc123 rest\n";
        assert_eq!(writer.write(line).unwrap(), line.len());
        assert_eq!(
            String::from_utf8(writer.inner).unwrap(),
            "create a.txt [TOKEN] rest\n"
        );
    }

    #[test]
    fn test_invalid_patterns_are_reported() {
        let mut config = LoggingConfig::default();
        config.redaction.patterns = vec![
            pattern("broken", r"(unclosed", "x"),
            pattern("digits", r"\d+", "#"),
        ];
        let (patterns, rejected) = compile_patterns(&config);
        assert_eq!(patterns.len(), 1);
        assert_eq!(rejected, vec!["broken".to_string()]);
    }

    #[test]
    fn test_disabled_redaction_compiles_nothing() {
        let mut config = LoggingConfig::default();
        config.redaction.enabled = false;
        config.redaction.patterns = vec![pattern("digits", r"\d+", "#")];
        let (patterns, rejected) = compile_patterns(&config);
        assert!(patterns.is_empty());
        assert!(rejected.is_empty());
    }
}

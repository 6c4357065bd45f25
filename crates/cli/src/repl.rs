//! Interactive loop – one instruction per line until `exit` or end of input.

use crate::config::ReplConfig;
use crate::output_report;
use dialoguer::Input;
use engine::Session;
use std::io::{self, BufRead, IsTerminal, Lines, StdinLock};

/// Where input lines come from.
enum LineSource {
    /// A person at a terminal: prompt with dialoguer.
    Terminal { prompt: String },
    /// Piped or redirected stdin: read raw lines, no prompt.
    Piped(Lines<StdinLock<'static>>),
}

impl LineSource {
    fn detect(prompt: &str) -> Self {
        if io::stdin().is_terminal() {
            LineSource::Terminal {
                prompt: prompt.to_string(),
            }
        } else {
            LineSource::Piped(io::stdin().lock().lines())
        }
    }

    /// Next line, or `None` once input is exhausted.
    fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        match self {
            LineSource::Terminal { prompt } => {
                match Input::<String>::new()
                    .with_prompt(prompt.as_str())
                    .allow_empty(true)
                    .interact_text()
                {
                    Ok(line) => Ok(Some(line)),
                    Err(e) => {
                        tracing::debug!(error = %e, "terminal input closed");
                        Ok(None)
                    }
                }
            }
            LineSource::Piped(lines) => Ok(lines.next().transpose()?),
        }
    }
}

pub fn run(mut session: Session, config: &ReplConfig, json: bool) -> anyhow::Result<()> {
    if config.banner && !json {
        println!("{}", session.registry().banner());
    }

    let mut source = LineSource::detect(&config.prompt);
    while let Some(line) = source.next_line()? {
        let report = session.handle_line(&line);
        output_report(&report, json);
        if let Some(code) = report.terminate_code() {
            session.context().process().terminate(code);
        }
    }

    tracing::debug!("end of input");
    Ok(())
}

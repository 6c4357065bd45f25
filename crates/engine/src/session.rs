//! Session – one line in, one [`Report`] out.
//!
//! Bundles the registry, the conductor and the capability context so every
//! front end (REPL, script runner, daemon) dispatches lines the same way.

use crate::conductor::{Conductor, ConductorError};
use crate::context::AppContext;
use crate::registry::{CommandRegistry, Instruction};
use crate::types::*;
use std::time::Instant;

pub struct Session {
    registry: CommandRegistry,
    conductor: Conductor,
    ctx: AppContext,
}

impl Session {
    pub fn new(ctx: AppContext) -> Self {
        Self::with_parts(CommandRegistry::new(), Conductor::new(), ctx)
    }

    pub fn with_parts(registry: CommandRegistry, conductor: Conductor, ctx: AppContext) -> Self {
        Self {
            registry,
            conductor,
            ctx,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn conductor(&self) -> &Conductor {
        &self.conductor
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Parse and carry out one input line.
    ///
    /// An `exit` line is recorded and reported with an
    /// [`Effect::Terminate`]; ending the process is left to the caller.
    pub fn handle_line(&mut self, line: &str) -> Report {
        let run_id = new_run_id();
        let _span = tracing::info_span!("instruction", run_id = %run_id).entered();
        let start = Instant::now();
        let instruction = line.trim_end_matches(['\r', '\n']);

        let parsed = match self.registry.parse(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "rejected input");
                return report_err(
                    instruction,
                    &run_id,
                    elapsed_ms(start),
                    e.error_code(),
                    e.to_string(),
                );
            }
        };

        let outcome = match parsed {
            Instruction::Empty => {
                return report_skip(instruction, &run_id, elapsed_ms(start), "");
            }
            Instruction::Help => {
                let mut r = report_ok(instruction, &run_id, elapsed_ms(start));
                r.message = self.registry.help();
                return r;
            }
            Instruction::History => {
                let mut r = report_ok(instruction, &run_id, elapsed_ms(start));
                r.message = self.conductor.render_history();
                return r;
            }
            Instruction::Run(command) => self.conductor.run(command, &self.ctx),
            Instruction::Undo => self.conductor.undo(&self.ctx),
            Instruction::Redo => self.conductor.redo(&self.ctx),
        };

        conclude(instruction, &run_id, elapsed_ms(start), outcome)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn conclude(
    instruction: &str,
    run_id: &str,
    total_ms: u64,
    outcome: Result<Effect, ConductorError>,
) -> Report {
    match outcome {
        Ok(effect) => {
            let mut r = report_ok(instruction, run_id, total_ms);
            r.message = effect.to_string();
            r.effect = Some(effect);
            r
        }
        Err(e) if e.is_benign() => report_skip(instruction, run_id, total_ms, e.to_string()),
        Err(e) => report_err(instruction, run_id, total_ms, e.error_code(), e.to_string()),
    }
}

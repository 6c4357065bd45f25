//! `retrace` – command line front end for the undo/redo command engine.
//!
//! Reads instructions (`create`, `delete`, `undo`, `redo`, `history`,
//! `exit`) interactively, from a YAML script, or from clients of a Unix
//! socket daemon. All three drive the same engine session.

mod config;
mod logging;
mod repl;
mod serve;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::types::*;
use engine::{AppContext, CommandRegistry, Conductor, Session};
use std::path::{Path, PathBuf};

// ===========================================================================
// CLI definition
// ===========================================================================

#[derive(Parser)]
#[command(
    name = "retrace",
    version,
    about = "Run file commands with a linear undo/redo history"
)]
struct Cli {
    /// Extra YAML config file, applied after retrace.yaml and .retrace.yaml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory resources are created in (overrides workspace.root).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Keep resources in memory; nothing touches disk.
    #[arg(long, global = true)]
    scratch: bool,

    /// Print one JSON report per instruction instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read instructions line by line (the default).
    Repl,

    /// Replay instructions from a YAML script and check expectations.
    RunScript {
        /// Path to the script YAML file.
        file: PathBuf,
    },

    /// Accept instructions from clients over a Unix socket.
    Serve {
        /// Path for the Unix domain socket.
        #[arg(long)]
        socket: PathBuf,
    },
}

// ===========================================================================
// Main
// ===========================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(2);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        config::load_config(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(root) = cli.root {
        config.workspace.root = root;
    }
    if cli.scratch {
        config.workspace.scratch = true;
    }
    if cli.log_json {
        config.logging.json = true;
    }

    logging::init_logging(&config.logging)?;
    tracing::debug!(?config, "configuration loaded");

    let session = build_session(&config)?;

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => repl::run(session, &config.repl, cli.json),
        Commands::RunScript { file } => cmd_run_script(&file, session, cli.json),
        Commands::Serve { socket } => serve::run_daemon(socket, session).await,
    }
}

fn build_session(config: &config::AppConfig) -> anyhow::Result<Session> {
    let ctx = if config.workspace.scratch {
        tracing::info!("using in-memory scratch store");
        AppContext::scratch()
    } else {
        let root = &config.workspace.root;
        std::fs::create_dir_all(root)
            .with_context(|| format!("cannot create workspace root {}", root.display()))?;
        tracing::info!(root = %root.display(), "using filesystem store");
        AppContext::default_platform(root)
    };
    Ok(Session::with_parts(
        CommandRegistry::new(),
        Conductor::with_policy(config.engine.undo_failure),
        ctx,
    ))
}

// ===========================================================================
// Subcommand implementations
// ===========================================================================

fn cmd_run_script(file: &Path, mut session: Session, json: bool) -> anyhow::Result<()> {
    let yaml = std::fs::read_to_string(file)
        .with_context(|| format!("cannot read script file {}", file.display()))?;
    let script = engine::script::load_script(&yaml).map_err(anyhow::Error::msg)?;

    let result = engine::script::run_script(&script, &mut session);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Script: {}", result.name.as_deref().unwrap_or("<unnamed>"));
        println!("Overall: {:?}", result.overall_status);
        for (i, r) in result.step_results.iter().enumerate() {
            println!(
                "  Step {}: {} -> {:?} ({}ms)",
                i, r.instruction, r.status, r.timing_ms
            );
        }
    }

    if result.overall_status == Status::Fail {
        std::process::exit(1);
    }
    Ok(())
}

// ===========================================================================
// Output helpers
// ===========================================================================

fn output_report(report: &Report, json: bool) {
    if json {
        let j = serde_json::to_string(report).unwrap_or_default();
        println!("{}", j);
    } else {
        print_human(report);
    }
}

fn print_human(r: &Report) {
    match r.error {
        Some(ref err) if err.code == ErrorCode::CommandNotFound => println!("{}", err.message),
        Some(ref err) => println!("error: {} ({})", err.message, err.code),
        None if !r.message.is_empty() => println!("{}", r.message),
        None => {}
    }
}

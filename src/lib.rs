//! Tidepool: a sandboxed task agent.
//!
//! Tidepool takes a short plain-English task ("count the Wednesdays in
//! /data/dates.txt"), maps it to exactly one operation from a fixed catalog, pulls
//! the parameters the operation needs out of the text, and runs it against a single
//! data directory, the **sandbox root**. Nothing outside that root is read, written
//! or deleted.
//!
//! # Pipeline
//!
//! ```text
//! task text -> classifier -> extractor -> sandbox guard -> handler -> Outcome | AgentError
//! ```
//!
//! - [`core::classifier`]: first matching descriptor in catalog order wins.
//! - [`core::params`]: extractors produce a `ParameterSet` from the original-case text.
//! - [`core::sandbox`]: every path-shaped parameter becomes a `SandboxPath` or is rejected.
//! - [`core::dispatcher`]: runs the handler and folds every failure into [`core::error::AgentError`].
//!
//! # Concurrency
//!
//! One invocation runs one operation on one thread. Operations write fixed output
//! names, so two invocations against the same sandbox root that touch the same
//! output race: publication is atomic per file, and the last writer wins.
//!
//! # Crate Structure
//!
//! - [`core`]: sandbox, registry, dispatcher, config, errors and shared helpers
//! - [`operations`]: the operation handlers (A1..A10, B3..B7)

pub mod core;
pub mod operations;

mod catalog;
mod cli;

use crate::cli::{Cli, Command, OutputFormat};
use crate::core::config::AgentConfig;
use crate::core::dispatcher::{Dispatcher, Plan};
use crate::core::error::AgentError;
use crate::core::registry::Outcome;
use crate::core::time;
use anyhow::Context;
use clap::Parser;
use colored::Colorize;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse the command line, run it, and return the process exit code.
pub fn run() -> anyhow::Result<u8> {
    let cli = Cli::parse();
    if let Command::Version = cli.command {
        println!("v{}", VERSION);
        return Ok(0);
    }

    let dotenv = dotenvy::dotenv();
    let mut config = AgentConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.apply_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    config.validate().context("validating configuration")?;
    init_tracing(&config.log_level);

    match dotenv {
        Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("failed to load .env file: {}", e),
    }

    let dispatcher = Dispatcher::new(config).context("opening sandbox")?;
    tracing::debug!(root = %dispatcher.sandbox().root().display(), "sandbox ready");
    let format = cli.format;

    let code = match cli.command {
        Command::Run { task } => {
            let task = task.join(" ");
            match dispatcher.run(&task) {
                Ok(outcome) => {
                    print_outcome(format, &outcome);
                    0
                }
                Err(err) => report_error(format, "run", &err),
            }
        }
        Command::Plan { task } => {
            let task = task.join(" ");
            match dispatcher.plan(&task) {
                Ok(plan) => {
                    print_plan(format, &plan)?;
                    0
                }
                Err(err) => report_error(format, "plan", &err),
            }
        }
        Command::Read { path } => match dispatcher.read(&path) {
            Ok(content) => {
                match format {
                    OutputFormat::Text => print!("{}", content),
                    OutputFormat::Json => println!(
                        "{}",
                        time::command_envelope(
                            "read",
                            "ok",
                            serde_json::json!({ "path": path, "content": content })
                        )
                    ),
                }
                0
            }
            Err(err) => report_error(format, "read", &err),
        },
        Command::Ops => {
            print_ops(format, &dispatcher)?;
            0
        }
        Command::Version => 0,
    };
    Ok(code)
}

/// `RUST_LOG` wins; otherwise the configured level. Logs go to stderr.
fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("tracing already initialised: {}", err);
    }
}

fn print_outcome(format: OutputFormat, outcome: &Outcome) {
    match format {
        OutputFormat::Text => {
            println!("{} {}", "✓".bright_green().bold(), outcome.message);
            for output in &outcome.outputs {
                println!(
                    "  {} {} ({} bytes, sha256 {})",
                    "→".bright_cyan(),
                    output.path,
                    output.bytes,
                    &output.sha256[..12.min(output.sha256.len())]
                );
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                time::command_envelope(
                    "run",
                    "ok",
                    serde_json::json!({ "message": outcome.message, "outputs": outcome.outputs })
                )
            );
        }
    }
}

fn print_plan(format: OutputFormat, plan: &Plan) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{} {}", plan.operation_id.bright_cyan().bold(), plan.summary);
            println!("  capabilities: {}", plan.capabilities.join(", "));
            for (name, value) in plan.params.iter() {
                println!("  {} = {}", name.bold(), serde_json::to_string(value)?);
            }
            if !plan.shadowed.is_empty() {
                println!("  also matched: {}", plan.shadowed.join(", ").dimmed());
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                time::command_envelope("plan", "ok", serde_json::json!({ "plan": plan }))
            );
        }
    }
    Ok(())
}

fn print_ops(format: OutputFormat, dispatcher: &Dispatcher) -> anyhow::Result<()> {
    let ops = dispatcher.registry().all();
    match format {
        OutputFormat::Text => {
            for op in ops {
                let caps: Vec<&str> = op.capabilities.iter().map(|c| c.as_str()).collect();
                println!(
                    "{:<4} {}  {}",
                    op.id.bright_cyan().bold(),
                    op.summary,
                    format!("[{}]", caps.join(", ")).dimmed()
                );
            }
        }
        OutputFormat::Json => {
            let listing: Vec<serde_json::Value> = ops
                .iter()
                .map(|op| {
                    serde_json::json!({
                        "id": op.id,
                        "summary": op.summary,
                        "capabilities": op.capabilities,
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&time::command_envelope(
                    "ops",
                    "ok",
                    serde_json::json!({ "operations": listing })
                ))?
            );
        }
    }
    Ok(())
}

fn report_error(format: OutputFormat, cmd: &str, err: &AgentError) -> u8 {
    match format {
        OutputFormat::Text => eprintln!(
            "{} {}",
            format!("error[{}]:", err.kind()).bright_red().bold(),
            err
        ),
        OutputFormat::Json => println!("{}", time::error_envelope(cmd, err)),
    }
    err.class().exit_code()
}

//! CLI struct definitions for the tidepool command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "tidepool",
    version = env!("CARGO_PKG_VERSION"),
    about = "Sandboxed task agent: turns a plain-English task into one confined operation.",
    disable_version_flag = true
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./tidepool.toml when present).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Sandbox root; overrides config and TIDEPOOL_DATA_DIR.
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Output format.
    #[clap(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Classify and execute a task.
    Run {
        /// Task description; multiple words are joined with spaces.
        #[clap(required = true, num_args = 1..)]
        task: Vec<String>,
    },
    /// Show which operation a task maps to and its parameters, without executing.
    Plan {
        #[clap(required = true, num_args = 1..)]
        task: Vec<String>,
    },
    /// Print a file from inside the sandbox.
    Read {
        /// Path as `/data/...`, `./data/...` or root-relative.
        path: String,
    },
    /// List registered operations in precedence order.
    Ops,
    /// Print version.
    Version,
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Config resolution order:
  1) --config/-c PATH
  2) $STATUSWATCH_CONFIG
  3) platform default: ~/.config/statuswatch/client.yaml (optional)

While watching, press Enter to refresh immediately.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "statuswatch-client",
    version,
    about = "Live view of a polled record listing that highlights what changed",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Source base URL (e.g., http://localhost:5000); overrides config
    #[arg(long)]
    pub server: Option<String>,
    /// Poll interval in milliseconds; overrides config
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Do not draw the table; log only
    #[arg(long)]
    pub no_render: bool,
    /// Optional subcommand. Without one, watches the source.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one snapshot and print it as JSON
    Fetch,
    /// Print the ids that are new or modified between two saved snapshots
    Diff {
        /// Earlier snapshot (JSON array)
        old: PathBuf,
        /// Later snapshot (JSON array)
        new: PathBuf,
    },
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

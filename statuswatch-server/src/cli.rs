use clap::Parser;

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (optional YAML: min_records, max_records, regenerate_every, seed, listen_port)
  PORT        (default: 5000 or config.listen_port)
"#;

#[derive(Debug, Parser)]
#[command(
    name = "statuswatch-server",
    version,
    about = "Demo record source for statuswatch",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Listen port; $PORT takes precedence
    #[arg(short, long)]
    pub port: Option<u16>,
}

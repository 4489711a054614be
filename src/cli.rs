use clap::Parser;
use std::path::PathBuf;

pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_NUMBER"));

#[derive(Parser, Debug)]
#[command(name = "plw", version = VERSION, about = "Pipeline Watcher TUI")]
pub struct Cli {
    /// Config file (default: ~/.config/plw/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Saved context to start in (overrides the last used one)
    #[arg(short, long)]
    pub context: Option<String>,

    /// Watch this GraphQL endpoint for the session without saving it
    #[arg(short, long)]
    pub url: Option<String>,

    /// Maximum number of runs per list for this session
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// List poll interval in seconds
    #[arg(short, long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Detail poll interval in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub detail_interval: u64,

    /// Per-request timeout in seconds
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Write debug logs to $XDG_STATE_HOME/plw/debug.log
    #[arg(short, long)]
    pub verbose: bool,
}

use std::path::PathBuf;

use clap::Parser;

/// Prism LLM gateway
#[derive(Debug, Parser)]
#[command(name = "prism", version, about)]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "PRISM_CONFIG", default_value = "prism.toml")]
    pub config: PathBuf,
}

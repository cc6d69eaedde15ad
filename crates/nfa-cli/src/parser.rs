//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// OpenAI-compatible proxy in front of the decentralized compute marketplace.
#[derive(Debug, Parser)]
#[command(name = "nfa-proxy")]
#[command(version, about)]
pub struct Cli {
    /// Port to listen on (overrides PORT / INTERNAL_API_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Environment file to load instead of .env / .env.test / .env.example
    #[arg(long = "env-file")]
    pub env_file: Option<PathBuf>,

    /// Disable the background sweep of expired sessions
    #[arg(long = "no-sweep")]
    pub no_sweep: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

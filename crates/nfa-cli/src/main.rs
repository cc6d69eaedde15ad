//! `nfa-proxy` entry point.

use clap::Parser;

use nfa_cli::{Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run(Cli::parse()).await
}

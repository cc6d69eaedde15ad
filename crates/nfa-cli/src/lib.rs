//! Composition root for the `nfa-proxy` binary.
//!
//! Parses the command line, loads environment files and settings, wires the
//! live marketplace client into the proxy and runs it until Ctrl+C.

pub mod bootstrap;
pub mod parser;

pub use bootstrap::{apply_overrides, init_tracing, load_env_files, run};
pub use parser::Cli;

//! Docpref Interface - command line access to preference collections
//!
//! Commands:
//! - get / set / remove / contains on single keys
//! - list / clear on a whole collection
//! - collections to enumerate preference files

pub mod cli;

#[cfg(test)]
mod cli_tests;

pub use cli::{run_cli, CliConfig, CliError};

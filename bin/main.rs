//! Docpref CLI Entry Point
//!
//! This binary provides the command-line interface for docpref.

use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = docpref_interface::run_cli().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

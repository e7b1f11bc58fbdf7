//! Snippet CLI
//!
//! Evaluates or checks snippets from a shell. Set `RUST_LOG=snippet_core=debug`
//! to watch compiles, cache hits and evictions.

use snippet_core::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

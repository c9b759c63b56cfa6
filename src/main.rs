//! trail-climate CLI entry point
//!
//! Climate summaries for hiking trails - CLI + web API

use trail_climate::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

//! testnode: ephemeral remote nodes for running tests

use clap::Parser;
use testnode_cli::cli::Cli;
use testnode_cli::output::json::format_error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    if let Err(e) = cli.run().await {
        if json {
            if let Ok(obj) = format_error(&format!("{e:#}"), "command_failed") {
                println!("{obj}");
            }
        }
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

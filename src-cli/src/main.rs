use std::process::ExitCode;

use clap::Parser;
use latebra::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = latebra_crypto_core::disable_core_dumps() {
        tracing::warn!(error = %e, "could not disable core dumps");
    }

    latebra::run(Cli::parse()).await
}

//! latebra command-line shell.
//!
//! Parses arguments, runs one blocking command on a worker thread, and
//! purges every tracked secret on completion or on SIGINT/SIGTERM.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod cli;
pub mod commands;
pub mod prompt;
pub mod state;
pub mod terminal;

use std::future::Future;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use latebra_crypto_core::memory::WipeRegistry;

use cli::Cli;
use state::AppState;
use terminal::TerminalMode;

/// Exit status after a signal-triggered purge (128 + SIGINT).
const INTERRUPTED: u8 = 130;

/// How a supervised command ended. The registry is already purged.
#[derive(Debug)]
enum Outcome {
    /// The command returned, successfully or not.
    Completed(Result<()>),
    /// The shutdown future resolved first.
    Interrupted { wiped: usize },
}

/// Run `cli` under the signal supervisor.
///
/// The command runs on a blocking thread. Whichever finishes first, the
/// command or a shutdown signal, the registry is purged before returning.
/// On a signal the terminal mode is restored and the process exits right
/// after the purge, without waiting for the worker thread.
pub async fn run(cli: Cli) -> ExitCode {
    let terminal = TerminalMode::capture();
    let outcome = supervise(
        WipeRegistry::new(),
        move |registry| execute(cli, registry),
        shutdown_signal(),
    )
    .await;

    match outcome {
        Outcome::Completed(Ok(())) => ExitCode::SUCCESS,
        Outcome::Completed(Err(e)) => {
            eprintln!("[!] {e:#}");
            ExitCode::FAILURE
        }
        Outcome::Interrupted { wiped } => {
            terminal.restore();
            eprintln!("\n[i] Memory purged ({wiped} buffers); exiting.");
            // The worker may be blocked on a prompt; returning would make
            // the runtime wait for it.
            std::process::exit(i32::from(INTERRUPTED));
        }
    }
}

/// Race `job` on a blocking thread against `shutdown`, then purge.
async fn supervise<F, S>(registry: WipeRegistry, job: F, shutdown: S) -> Outcome
where
    F: FnOnce(WipeRegistry) -> Result<()> + Send + 'static,
    S: Future<Output = ()>,
{
    let worker_registry = registry.clone();
    let worker = tokio::task::spawn_blocking(move || job(worker_registry));

    tokio::select! {
        joined = worker => {
            let wiped = registry.purge();
            tracing::debug!(wiped, "registry purged");
            Outcome::Completed(joined.unwrap_or_else(|e| Err(anyhow!("command aborted: {e}"))))
        }
        () = shutdown => Outcome::Interrupted { wiped: registry.purge() },
    }
}

fn execute(cli: Cli, registry: WipeRegistry) -> Result<()> {
    let data_dir = state::resolve_data_dir(cli.home)?;
    let state = AppState::load(data_dir, cli.cost, registry)?;
    commands::execute(&state, cli.command)
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
///
/// Never resolves if no handler could be installed, so a missing handler
/// does not look like a signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c => tracing::info!("received SIGINT"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await;
                tracing::info!("received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        tracing::info!("received Ctrl+C");
    }
}

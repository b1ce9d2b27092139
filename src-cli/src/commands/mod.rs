//! Command dispatch.
//!
//! Prompts happen here, after the store is open and before any key
//! derivation, so a bad data directory fails before the password is asked.

pub mod entries;
pub mod shell;

use std::io;

use anyhow::Result;

use crate::cli::Command;
use crate::prompt;
use crate::state::AppState;

/// Run one command to completion.
///
/// # Errors
///
/// Returns the first error the command hits.
pub fn execute(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Add { label, from } => {
            let store = state.open_store()?;
            let label = prompt::label(label)?;
            let data = prompt::read_data(from.as_deref())?;
            let session = state.unlock(prompt::password(true)?.as_bytes())?;
            entries::add(&store, &session, &label, &data)
        }
        Command::Get { label, to } => {
            let store = state.open_store()?;
            let label = prompt::label(label)?;
            let session = state.unlock(prompt::password(false)?.as_bytes())?;
            entries::get(&store, &session, &label, to.as_deref(), &mut io::stdout().lock())
        }
        Command::Forget { label } => {
            let store = state.open_store()?;
            let label = prompt::label(label)?;
            let session = state.unlock(prompt::password(false)?.as_bytes())?;
            entries::forget(&store, &session, &label)
        }
        Command::Decoys { count } => entries::decoys(&state.open_store()?, count),
        Command::Shell => {
            let store = state.open_store()?;
            let session = state.unlock(prompt::password(false)?.as_bytes())?;
            shell::run(
                &store,
                &session,
                &mut io::stdin().lock(),
                &mut io::stdout().lock(),
            )
        }
        Command::Init { block_size } => init(state, block_size),
    }
}

/// Persist the effective configuration, with an optional new block size.
fn init(state: &AppState, block_size: Option<usize>) -> Result<()> {
    let mut config = state.config;
    if let Some(block_size) = block_size {
        config.block_size = block_size;
    }
    config.validate()?;
    config.save(&state.data_dir)?;
    eprintln!(
        "[+] Configuration written to {} (block size {}, cost {}).",
        state.data_dir.display(),
        config.block_size,
        config.cost
    );
    Ok(())
}

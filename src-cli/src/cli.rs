//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use latebra_crypto_core::kdf::CostParameters;

#[derive(Parser, Debug)]
#[command(
    name = "latebra",
    version,
    about = "Deniable, password-derived secret store",
    long_about = "latebra stores each entry as equal-size sealed chunks addressed only by \
                  values derived from the master password and the entry label. Without both, \
                  the store is indistinguishable from random decoys."
)]
pub struct Cli {
    /// Data directory (default: ~/.latebra)
    #[arg(long, global = true, env = "LATEBRA_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// scrypt cost factors `N,r,p` (N is the log2 work factor); overrides the configured cost
    #[arg(short = 'c', long = "cost", global = true, value_name = "N,r,p")]
    pub cost: Option<CostParameters>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a new entry
    #[command(visible_alias = "import")]
    Add {
        /// Entry label (prompted if omitted)
        label: Option<String>,
        /// Read the entry data from this file instead of standard input
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
    },

    /// Retrieve an entry
    #[command(visible_aliases = ["export", "peak", "peek"])]
    Get {
        /// Entry label (prompted if omitted)
        label: Option<String>,
        /// Write the entry to this new file instead of the terminal
        #[arg(long, value_name = "FILE")]
        to: Option<PathBuf>,
    },

    /// Delete an entry
    #[command(visible_alias = "remove")]
    Forget {
        /// Entry label (prompted if omitted)
        label: Option<String>,
    },

    /// Insert decoy chunks
    Decoys {
        /// Number of decoys to insert
        count: usize,
    },

    /// Unlock once, then run commands against the same session
    Shell,

    /// Write the effective configuration to the data directory
    Init {
        /// Padded block size in bytes
        #[arg(long, value_name = "BYTES")]
        block_size: Option<usize>,
    },
}

//! CLI definition for jpp.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fetch, verify and pay JSON Payment Protocol requests.
#[derive(Parser, Debug)]
#[command(name = "jpp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, env = "JPP_CONFIG", default_value = "jpp.toml")]
    pub config: PathBuf,

    /// Expected network, overriding the configuration file.
    #[arg(long, env = "JPP_NETWORK")]
    pub network: Option<String>,

    /// Expected currency, overriding the configuration file.
    #[arg(long, env = "JPP_CURRENCY")]
    pub currency: Option<String>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch and verify a payment request, then print its terms.
    Inspect {
        /// Payment URI (`https://...` or `bitcoin:?r=...`).
        uri: String,
    },
    /// Ask the server to check an unsigned transaction before signing it.
    VerifyTx {
        /// Payment URI (`https://...` or `bitcoin:?r=...`).
        uri: String,
        /// Hex-encoded unsigned transaction.
        #[arg(long)]
        tx: String,
        /// Expected weighted size of the signed transaction, in bytes.
        #[arg(long)]
        weighted_size: u64,
    },
    /// Send a signed transaction to the payment server.
    Pay {
        /// Payment URI (`https://...` or `bitcoin:?r=...`).
        uri: String,
        /// Hex-encoded signed transaction.
        #[arg(long)]
        tx: String,
    },
}

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::commands::{guard, keygen, revoke, sign, status, verify};

#[derive(Parser, Debug)]
#[command(
    name = "mandate",
    version,
    about = "Sign, verify, guard and revoke payment mandates for autonomous agents"
)]
pub struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate an ed25519 keypair for signing mandates
    Keygen(keygen::KeygenArgs),

    /// Sign a mandate payload into an envelope
    Sign(sign::SignArgs),

    /// Validate an envelope and verify its signature
    Verify(verify::VerifyArgs),

    /// Verify an envelope and decide whether it may be exercised now
    Guard(guard::GuardArgs),

    /// Revoke a mandate
    Revoke(revoke::RevokeArgs),

    /// Show the lifecycle state of a mandate
    Status(status::StatusArgs),

    /// List (or clear) recorded revocations
    Revocations(revoke::RevocationsArgs),
}

/// Revocation ledger location.
#[derive(Args, Debug, Clone)]
pub struct LedgerArgs {
    /// SQLite revocation ledger; only `revoke` creates it, other commands
    /// treat a missing file as "nothing revoked"
    #[arg(long, env = "MANDATE_LEDGER", default_value = "mandate-revocations.db")]
    pub ledger: PathBuf,
}

/// Guard policy location.
#[derive(Args, Debug, Clone)]
pub struct PolicyArgs {
    /// Guard policy file (YAML); defaults apply when absent
    #[arg(long, env = "MANDATE_POLICY")]
    pub policy: Option<PathBuf>,
}

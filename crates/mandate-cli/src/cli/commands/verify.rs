//! `mandate verify` - Validate an envelope and verify its signature.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use mandate_core::guard::Verification;

use super::{build_guard, read_json, CliError};
use crate::cli::args::{LedgerArgs, PolicyArgs};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Signed mandate envelope (JSON)
    pub envelope: PathBuf,

    #[command(flatten)]
    pub ledger: LedgerArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

pub fn cmd_verify(args: VerifyArgs) -> i32 {
    let quiet = args.quiet;
    match run_verify(&args) {
        Ok(mandate_id) => {
            if !quiet {
                println!("valid: {mandate_id}");
            }
            crate::exit_codes::SUCCESS
        }
        Err(e) if quiet => e
            .downcast_ref::<CliError>()
            .map_or(crate::exit_codes::ERROR, CliError::exit_code),
        Err(e) => super::report(&e),
    }
}

fn run_verify(args: &VerifyArgs) -> Result<String> {
    let guard = build_guard(&args.ledger, &args.policy)?;
    let candidate = read_json(&args.envelope)?;

    match guard.validate_and_verify(&candidate) {
        Verification::Valid { parsed } => Ok(parsed.mandate_id().to_string()),
        Verification::Invalid { kind, reason } => Err(CliError::from_rejection(kind, reason)),
    }
}


//! `mandate status` - Lifecycle state of a signed mandate.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::PathBuf;

use mandate_core::guard::{REASON_SIGNATURE_INVALID, REASON_UNTRUSTED_SIGNER};
use mandate_core::ledger::RevocationLedger;
use mandate_core::mandate::{validate, verify_mandate};

use super::{build_guard, exit_with, parse_instant, read_json, CliError};
use crate::cli::args::{LedgerArgs, PolicyArgs};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Signed mandate envelope (JSON)
    pub envelope: PathBuf,

    /// Evaluate at this instant (RFC 3339) instead of now
    #[arg(long, value_parser = parse_instant)]
    pub at: Option<DateTime<Utc>>,

    #[command(flatten)]
    pub ledger: LedgerArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

pub fn cmd_status(args: StatusArgs) -> i32 {
    exit_with(run_status(&args))
}

fn run_status(args: &StatusArgs) -> Result<()> {
    let guard = build_guard(&args.ledger, &args.policy)?;
    let candidate = read_json(&args.envelope)?;

    // Revoked mandates still report a status, so admission is not used here.
    let mandate = validate(&candidate).map_err(|e| CliError::Invalid(e.to_string()))?;
    if !verify_mandate(&mandate) {
        return Err(CliError::Invalid(REASON_SIGNATURE_INVALID.to_string()).into());
    }
    if !guard.policy().is_pubkey_trusted(&mandate.pubkey) {
        return Err(CliError::Invalid(REASON_UNTRUSTED_SIGNER.to_string()).into());
    }

    let now = args.at.unwrap_or_else(Utc::now);
    let status = guard
        .status_at(&mandate, now)
        .context("failed to read revocation ledger")?;

    println!("{}: {}", mandate.mandate_id(), status.as_str());
    if let Some(record) = guard.ledger().get_revocation(mandate.mandate_id())? {
        if let Some(reason) = record.reason {
            println!("  reason: {reason}");
        }
    }
    Ok(())
}

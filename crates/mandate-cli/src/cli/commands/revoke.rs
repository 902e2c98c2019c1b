//! `mandate revoke` / `mandate revocations` - Manage the revocation ledger.

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::Args;

use mandate_core::ledger::RevocationLedger;

use super::{exit_with, open_ledger, open_ledger_existing};
use crate::cli::args::LedgerArgs;

#[derive(Args, Debug)]
pub struct RevokeArgs {
    /// Identifier of the mandate to revoke
    pub mandate_id: String,

    /// Free-form reason stored with the revocation
    #[arg(long)]
    pub reason: Option<String>,

    #[command(flatten)]
    pub ledger: LedgerArgs,
}

#[derive(Args, Debug)]
pub struct RevocationsArgs {
    /// Remove every recorded revocation
    #[arg(long)]
    pub clear: bool,

    /// Print records as JSON
    #[arg(long, conflicts_with = "clear")]
    pub json: bool,

    #[command(flatten)]
    pub ledger: LedgerArgs,
}

pub fn cmd_revoke(args: RevokeArgs) -> i32 {
    exit_with(run_revoke(&args))
}

pub fn cmd_revocations(args: RevocationsArgs) -> i32 {
    exit_with(run_revocations(&args))
}

fn run_revoke(args: &RevokeArgs) -> Result<()> {
    let ledger = open_ledger(&args.ledger)?;
    let record = ledger
        .revoke(&args.mandate_id, args.reason.as_deref())
        .context("failed to record revocation")?;
    println!(
        "revoked: {} at {}",
        record.mandate_id,
        record.revoked_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    Ok(())
}

fn run_revocations(args: &RevocationsArgs) -> Result<()> {
    let ledger = open_ledger_existing(&args.ledger)?;

    if args.clear {
        let count = ledger.list_all()?.len();
        ledger.clear().context("failed to clear ledger")?;
        tracing::warn!(count, "revocation ledger cleared");
        println!("cleared {count} revocation(s)");
        return Ok(());
    }

    let records = ledger.list_all().context("failed to list revocations")?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("no revocations");
    }
    for r in &records {
        let when = r.revoked_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        match &r.reason {
            Some(reason) => println!("{}  {}  {}", r.mandate_id, when, reason),
            None => println!("{}  {}", r.mandate_id, when),
        }
    }
    Ok(())
}

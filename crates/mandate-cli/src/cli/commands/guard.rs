//! `mandate guard` - Decide whether a mandate may be exercised.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use mandate_core::guard::{ChargeRequest, ExecutionDecision, Verification};

use super::{build_guard, exit_with, parse_instant, read_json, CliError};
use crate::cli::args::{LedgerArgs, PolicyArgs};

#[derive(Args, Debug)]
pub struct GuardArgs {
    /// Signed mandate envelope (JSON)
    pub envelope: PathBuf,

    /// Evaluate at this instant (RFC 3339) instead of now
    #[arg(long, value_parser = parse_instant)]
    pub at: Option<DateTime<Utc>>,

    /// Charge amount in minor currency units
    #[arg(long, requires = "currency")]
    pub amount: Option<u64>,

    /// Charge currency
    #[arg(long, requires = "amount")]
    pub currency: Option<String>,

    /// Merchant receiving the charge
    #[arg(long, requires = "amount")]
    pub merchant: Option<String>,

    /// Print the decision as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub ledger: LedgerArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,
}

pub fn cmd_guard(args: GuardArgs) -> i32 {
    exit_with(run_guard(&args))
}

fn run_guard(args: &GuardArgs) -> Result<()> {
    let guard = build_guard(&args.ledger, &args.policy)?;
    let candidate = read_json(&args.envelope)?;

    let mandate = match guard.validate_and_verify(&candidate) {
        Verification::Valid { parsed } => parsed,
        Verification::Invalid { kind, reason } => {
            if args.json {
                println!("{}", json!({"allowed": false, "reason": reason}));
            }
            return Err(CliError::from_rejection(kind, reason));
        }
    };

    let now = args.at.unwrap_or_else(Utc::now);
    let decision = match (args.amount, &args.currency) {
        (Some(amount), Some(currency)) => {
            let mut charge = ChargeRequest::new(amount, currency.clone());
            charge.merchant = args.merchant.clone();
            guard.guard_charge(&mandate, &charge, now)
        }
        _ => guard.guard_execution(&mandate, now),
    };

    match decision {
        ExecutionDecision::Allowed => {
            if args.json {
                println!(
                    "{}",
                    json!({"allowed": true, "mandate_id": mandate.mandate_id()})
                );
            } else {
                println!("allowed: {}", mandate.mandate_id());
            }
            Ok(())
        }
        ExecutionDecision::Denied { reason } => {
            if args.json {
                println!("{}", json!({"allowed": false, "reason": reason.as_str()}));
            }
            Err(CliError::Denied(reason.to_string()).into())
        }
    }
}

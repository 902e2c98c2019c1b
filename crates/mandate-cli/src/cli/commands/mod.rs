pub mod guard;
pub mod keygen;
pub mod revoke;
pub mod sign;
pub mod status;
pub mod verify;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mandate_core::guard::{GuardPolicy, MandateGuard, RejectionKind};
use mandate_core::ledger::SqliteLedger;
use mandate_core::mandate::{schema, Timestamp};
use std::fs;
use std::path::Path;

use super::args::{Cli, Command, LedgerArgs, PolicyArgs};
use crate::exit_codes;

pub fn dispatch(cli: Cli) -> i32 {
    match cli.cmd {
        Command::Keygen(args) => keygen::cmd_keygen(args),
        Command::Sign(args) => sign::cmd_sign(args),
        Command::Verify(args) => verify::cmd_verify(args),
        Command::Guard(args) => guard::cmd_guard(args),
        Command::Revoke(args) => revoke::cmd_revoke(args),
        Command::Status(args) => status::cmd_status(args),
        Command::Revocations(args) => revoke::cmd_revocations(args),
    }
}

/// Failures that carry their own exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("invalid: {0}")]
    Invalid(String),

    #[error("denied: {0}")]
    Denied(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_codes::CONFIG_ERROR,
            Self::Invalid(_) => exit_codes::INVALID,
            Self::Denied(_) => exit_codes::DENIED,
        }
    }

    /// Map an admission rejection to its exit class.
    pub fn from_rejection(kind: RejectionKind, reason: String) -> anyhow::Error {
        match kind {
            RejectionKind::Revoked => Self::Denied(reason).into(),
            RejectionKind::LedgerUnavailable => anyhow::anyhow!(reason),
            RejectionKind::Schema | RejectionKind::Signature | RejectionKind::UntrustedSigner => {
                Self::Invalid(reason).into()
            }
        }
    }
}

/// Print the error and pick the exit code.
pub(crate) fn report(e: &anyhow::Error) -> i32 {
    eprintln!("error: {e:#}");
    match e.downcast_ref::<CliError>() {
        Some(cli_err) => cli_err.exit_code(),
        None => exit_codes::ERROR,
    }
}

pub(crate) fn exit_with(result: Result<()>) -> i32 {
    match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => report(&e),
    }
}

/// Read a JSON document. Text that is not JSON, or that repeats a key in
/// any object, is an invalid input.
pub(crate) fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    schema::parse_strict(&raw)
        .map_err(|e| CliError::Invalid(format!("{} is not valid JSON: {e}", path.display())).into())
}

/// Open the ledger for reading. A missing file means nothing has been
/// revoked yet, so an empty in-memory ledger stands in and no file is created.
pub(crate) fn open_ledger_existing(args: &LedgerArgs) -> Result<SqliteLedger> {
    if args.ledger.exists() {
        return open_ledger(args);
    }
    tracing::debug!(path = %args.ledger.display(), "ledger file absent, using empty ledger");
    SqliteLedger::memory()
        .map_err(|e| CliError::Config(format!("failed to open in-memory ledger: {e}")).into())
}

/// Open the ledger for writing, creating the file if needed.
pub(crate) fn open_ledger(args: &LedgerArgs) -> Result<SqliteLedger> {
    SqliteLedger::open(&args.ledger).map_err(|e| {
        CliError::Config(format!(
            "failed to open ledger {}: {e}",
            args.ledger.display()
        ))
        .into()
    })
}

pub(crate) fn load_policy(args: &PolicyArgs) -> Result<GuardPolicy> {
    match &args.policy {
        Some(path) => {
            GuardPolicy::from_file(path).map_err(|e| CliError::Config(format!("{e:#}")).into())
        }
        None => Ok(GuardPolicy::default()),
    }
}

pub(crate) fn build_guard(
    ledger: &LedgerArgs,
    policy: &PolicyArgs,
) -> Result<MandateGuard<SqliteLedger>> {
    let policy = load_policy(policy)?;
    let ledger = open_ledger_existing(ledger)?;
    tracing::debug!(
        clock_skew_seconds = policy.clock_skew_seconds,
        trusted_keys = policy.trusted_pubkeys.len(),
        "guard configured"
    );
    Ok(MandateGuard::new(ledger, policy))
}

/// clap value parser for `--at`.
pub(crate) fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    Timestamp::parse(s)
        .map(|ts| ts.instant())
        .map_err(|e| format!("invalid RFC 3339 timestamp '{s}': {e}"))
}

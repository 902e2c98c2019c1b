//! `mandate sign` - Sign a mandate payload.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use mandate_core::mandate::{load_signing_key_pem, payload_digest, sign_mandate, validate_body};

use super::{exit_with, read_json, CliError};

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Mandate payload file (JSON)
    pub payload: PathBuf,

    /// Private key file (PKCS#8 PEM)
    #[arg(long, short)]
    pub key: PathBuf,

    /// Output file for the signed envelope (stdout if omitted)
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

pub fn cmd_sign(args: SignArgs) -> i32 {
    exit_with(run_sign(args))
}

fn run_sign(args: SignArgs) -> Result<()> {
    let pem = fs::read_to_string(&args.key)
        .with_context(|| format!("failed to read private key: {}", args.key.display()))?;
    let signing_key = load_signing_key_pem(&pem).map_err(|e| {
        CliError::Config(format!("failed to load {}: {e}", args.key.display()))
    })?;

    let candidate = read_json(&args.payload)?;
    let body = validate_body(&candidate).map_err(|e| CliError::Invalid(e.to_string()))?;

    let digest = payload_digest(&body)?;
    let signed = sign_mandate(body, &signing_key)?;
    let output = serde_json::to_string_pretty(&signed).context("failed to serialize envelope")?;

    match &args.out {
        Some(path) => {
            fs::write(path, format!("{output}\n"))
                .with_context(|| format!("failed to write output: {}", path.display()))?;
            eprintln!("Signed {} -> {}", signed.mandate_id(), path.display());
            eprintln!("  digest: {digest}");
        }
        None => println!("{output}"),
    }

    Ok(())
}

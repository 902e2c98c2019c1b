//! `mandate keygen` - Generate an ed25519 keypair for signing.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use mandate_core::mandate::{signing_key_to_pem, AgentIdentity};

use super::exit_with;

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for key files
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Force overwrite existing files
    #[arg(long, short)]
    pub force: bool,
}

pub fn cmd_keygen(args: KeygenArgs) -> i32 {
    exit_with(run_keygen(args))
}

fn run_keygen(args: KeygenArgs) -> Result<()> {
    if !args.out.exists() {
        fs::create_dir_all(&args.out)
            .with_context(|| format!("failed to create directory: {}", args.out.display()))?;
    }

    let private_path = args.out.join("mandate_key.pem");
    let public_path = args.out.join("mandate_key.pub");

    if !args.force {
        for path in [&private_path, &public_path] {
            if path.exists() {
                anyhow::bail!(
                    "key file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
        }
    }

    let identity = AgentIdentity::generate();
    let private_pem = signing_key_to_pem(&identity.signing_key)
        .context("failed to encode private key as PKCS#8 PEM")?;

    fs::write(&private_path, private_pem.as_bytes())
        .with_context(|| format!("failed to write private key: {}", private_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&private_path, perms)
            .with_context(|| format!("failed to set permissions on: {}", private_path.display()))?;
    }

    fs::write(&public_path, format!("{}\n", identity.pubkey))
        .with_context(|| format!("failed to write public key: {}", public_path.display()))?;

    tracing::info!(path = %private_path.display(), "generated signing key");

    println!("Generated ed25519 keypair:");
    println!(
        "  Private key: {} (PKCS#8 PEM, mode 0600)",
        private_path.display()
    );
    println!("  Public key:  {} (base64)", public_path.display());
    println!();
    println!("pubkey: {}", identity.pubkey);
    println!();
    println!("Add this pubkey to trusted_pubkeys in your guard policy to pin this signer.");

    Ok(())
}

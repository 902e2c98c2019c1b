//! Guard policy configuration.
//!
//! # Example
//!
//! ```yaml
//! # Tolerance applied to both edges of the validity window
//! clock_skew_seconds: 30
//!
//! # Only mandates signed by these keys verify (empty = any key)
//! trusted_pubkeys:
//!   - "iojj3XQJ8ZX9UtstPLpdcspnCb8dlBIb83SIAbQPb1w="
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Policy the guard applies on top of structural and cryptographic checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardPolicy {
    /// Seconds of tolerance added to both window edges (default 0: exact)
    #[serde(default)]
    pub clock_skew_seconds: u32,

    /// Base64 Ed25519 public keys whose signatures are accepted
    #[serde(default)]
    pub trusted_pubkeys: Vec<String>,
}

impl GuardPolicy {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read guard policy: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("invalid guard policy: {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let policy: Self = serde_yaml::from_str(yaml).context("failed to parse guard policy")?;
        if policy.trusted_pubkeys.iter().any(|k| k.trim().is_empty()) {
            anyhow::bail!("trusted_pubkeys must not contain empty entries");
        }
        Ok(policy)
    }

    pub fn with_clock_skew(mut self, seconds: u32) -> Self {
        self.clock_skew_seconds = seconds;
        self
    }

    pub fn with_trusted_pubkey(mut self, pubkey: impl Into<String>) -> Self {
        self.trusted_pubkeys.push(pubkey.into());
        self
    }

    /// Empty list = any key is trusted.
    pub fn is_pubkey_trusted(&self, pubkey: &str) -> bool {
        self.trusted_pubkeys.is_empty() || self.trusted_pubkeys.iter().any(|k| k == pubkey)
    }

    pub fn clock_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.clock_skew_seconds))
    }
}

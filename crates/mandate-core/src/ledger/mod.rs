//! Revocation ledger.
//!
//! The authoritative record of invalidated mandate identifiers. The ledger is
//! the only stateful component of the subsystem; the guard receives one at
//! construction and never reaches for a global.
//!
//! Two stores implement [`RevocationLedger`]:
//! - [`MemoryLedger`]: process-local, for tests and embedded use
//! - [`SqliteLedger`]: durable, shared between processes through one file

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryLedger;
pub use schema::REVOCATION_SCHEMA;
pub use sqlite::SqliteLedger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A revoked mandate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub mandate_id: String,
    pub revoked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RevocationRecord {
    pub fn new(mandate_id: impl Into<String>, revoked_at: DateTime<Utc>) -> Self {
        Self {
            mandate_id: mandate_id.into(),
            revoked_at,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Ledger errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The backing store could not be read or written.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("mandate_id must not be empty")]
    EmptyMandateId,
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Unavailable(e.to_string())
    }
}

/// Store of revoked mandate identifiers.
///
/// Revocation is idempotent: revoking an already-revoked mandate replaces
/// its reason and timestamp (last write wins) and never errors. Reads
/// observe all prior completed writes for the same `mandate_id`.
pub trait RevocationLedger: Send + Sync {
    /// Insert or replace a record with an explicit timestamp.
    fn record(&self, record: RevocationRecord) -> Result<(), LedgerError>;

    fn get_revocation(&self, mandate_id: &str) -> Result<Option<RevocationRecord>, LedgerError>;

    /// All records. Order is store-specific and not part of the contract.
    fn list_all(&self) -> Result<Vec<RevocationRecord>, LedgerError>;

    /// Remove every record (administrative reset).
    fn clear(&self) -> Result<(), LedgerError>;

    /// Revoke a mandate now.
    fn revoke(
        &self,
        mandate_id: &str,
        reason: Option<&str>,
    ) -> Result<RevocationRecord, LedgerError> {
        let mut record = RevocationRecord::new(mandate_id, Utc::now());
        record.reason = reason.map(str::to_string);
        self.record(record.clone())?;
        tracing::info!(mandate_id, reason = ?reason, "mandate revoked");
        Ok(record)
    }

    fn is_revoked(&self, mandate_id: &str) -> Result<bool, LedgerError> {
        Ok(self.get_revocation(mandate_id)?.is_some())
    }
}

impl<L: RevocationLedger + ?Sized> RevocationLedger for Arc<L> {
    fn record(&self, record: RevocationRecord) -> Result<(), LedgerError> {
        (**self).record(record)
    }

    fn get_revocation(&self, mandate_id: &str) -> Result<Option<RevocationRecord>, LedgerError> {
        (**self).get_revocation(mandate_id)
    }

    fn list_all(&self) -> Result<Vec<RevocationRecord>, LedgerError> {
        (**self).list_all()
    }

    fn clear(&self) -> Result<(), LedgerError> {
        (**self).clear()
    }

    fn revoke(
        &self,
        mandate_id: &str,
        reason: Option<&str>,
    ) -> Result<RevocationRecord, LedgerError> {
        (**self).revoke(mandate_id, reason)
    }

    fn is_revoked(&self, mandate_id: &str) -> Result<bool, LedgerError> {
        (**self).is_revoked(mandate_id)
    }
}

fn check_mandate_id(mandate_id: &str) -> Result<(), LedgerError> {
    if mandate_id.trim().is_empty() {
        return Err(LedgerError::EmptyMandateId);
    }
    Ok(())
}

//! In-process revocation ledger.

use super::{check_mandate_id, LedgerError, RevocationLedger, RevocationRecord};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, RevocationRecord>,
    /// First-revocation order
    order: Vec<String>,
}

/// `RwLock`-guarded map; `list_all` returns records in first-revocation order.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> LedgerError {
    LedgerError::Unavailable("ledger lock poisoned".to_string())
}

impl RevocationLedger for MemoryLedger {
    fn record(&self, record: RevocationRecord) -> Result<(), LedgerError> {
        check_mandate_id(&record.mandate_id)?;
        let mut inner = self.inner.write().map_err(poisoned)?;
        if !inner.records.contains_key(&record.mandate_id) {
            inner.order.push(record.mandate_id.clone());
        }
        inner.records.insert(record.mandate_id.clone(), record);
        Ok(())
    }

    fn get_revocation(&self, mandate_id: &str) -> Result<Option<RevocationRecord>, LedgerError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.records.get(mandate_id).cloned())
    }

    fn list_all(&self) -> Result<Vec<RevocationRecord>, LedgerError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    fn clear(&self) -> Result<(), LedgerError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.records.clear();
        inner.order.clear();
        Ok(())
    }
}

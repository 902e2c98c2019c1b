//! SQLite-backed revocation ledger.

use super::schema::REVOCATION_SCHEMA;
use super::{check_mandate_id, LedgerError, RevocationLedger, RevocationRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Durable ledger.
///
/// Access is serialised through one connection, so a read issued after a
/// completed revoke of the same `mandate_id` always observes it. Clones share
/// the connection.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open (or create) a file-backed ledger.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory ledger (for testing).
    pub fn memory() -> Result<Self, LedgerError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, LedgerError> {
        Self::init_connection(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_connection(conn: &Connection) -> Result<(), LedgerError> {
        // WAL mode for file-backed DBs (no-op for in-memory)
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL");
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(REVOCATION_SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Unavailable("ledger connection lock poisoned".to_string()))
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LedgerError::Unavailable(format!("invalid revoked_at timestamp: {e}")))
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, String, Option<String>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_record(
    (mandate_id, revoked_at, reason): (String, String, Option<String>),
) -> Result<RevocationRecord, LedgerError> {
    Ok(RevocationRecord {
        mandate_id,
        revoked_at: parse_ts(&revoked_at)?,
        reason,
    })
}

impl RevocationLedger for SqliteLedger {
    fn record(&self, record: RevocationRecord) -> Result<(), LedgerError> {
        check_mandate_id(&record.mandate_id)?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO revocations (mandate_id, revoked_at, reason)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(mandate_id) DO UPDATE SET
                revoked_at = excluded.revoked_at,
                reason = excluded.reason
            "#,
            params![
                record.mandate_id,
                format_ts(&record.revoked_at),
                record.reason
            ],
        )?;
        Ok(())
    }

    fn get_revocation(&self, mandate_id: &str) -> Result<Option<RevocationRecord>, LedgerError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT mandate_id, revoked_at, reason FROM revocations WHERE mandate_id = ?1",
                [mandate_id],
                read_row,
            )
            .optional()?;
        row.map(into_record).transpose()
    }

    fn list_all(&self) -> Result<Vec<RevocationRecord>, LedgerError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT mandate_id, revoked_at, reason FROM revocations ORDER BY seq")?;
        let rows = stmt.query_map([], read_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(into_record(row?)?);
        }
        Ok(out)
    }

    fn clear(&self) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM revocations", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_revoke_and_lookup() {
        let ledger = SqliteLedger::memory().unwrap();
        assert!(!ledger.is_revoked("m-0001").unwrap());
        ledger.revoke("m-0001", Some("compromised")).unwrap();
        assert!(ledger.is_revoked("m-0001").unwrap());

        let record = ledger.get_revocation("m-0001").unwrap().unwrap();
        assert_eq!(record.reason.as_deref(), Some("compromised"));
    }

    #[test]
    fn test_upsert_last_write_wins() {
        let ledger = SqliteLedger::memory().unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap();

        ledger
            .record(RevocationRecord::new("m-0001", t1).with_reason("a"))
            .unwrap();
        ledger.record(RevocationRecord::new("m-0002", t1)).unwrap();
        ledger
            .record(RevocationRecord::new("m-0001", t2).with_reason("b"))
            .unwrap();

        let all = ledger.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].mandate_id, "m-0001");
        assert_eq!(all[0].revoked_at, t2);
        assert_eq!(all[0].reason.as_deref(), Some("b"));
        assert_eq!(all[1].reason, None);
    }

    #[test]
    fn test_subsecond_timestamps_survive() {
        let ledger = SqliteLedger::memory().unwrap();
        let t = Utc.timestamp_opt(1_800_000_000, 123_456_789).unwrap();
        ledger.record(RevocationRecord::new("m-0001", t)).unwrap();
        assert_eq!(
            ledger.get_revocation("m-0001").unwrap().unwrap().revoked_at,
            t
        );
    }

    #[test]
    fn test_clear() {
        let ledger = SqliteLedger::memory().unwrap();
        ledger.revoke("m-0001", None).unwrap();
        ledger.clear().unwrap();
        assert!(ledger.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_timestamp_is_unavailable() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(REVOCATION_SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO revocations (mandate_id, revoked_at) VALUES ('m-0001', 'yesterday')",
            [],
        )
        .unwrap();
        let ledger = SqliteLedger::from_connection(conn).unwrap();
        assert!(matches!(
            ledger.is_revoked("m-0001"),
            Err(LedgerError::Unavailable(_))
        ));
    }

    #[test]
    fn test_clones_share_state() {
        let ledger = SqliteLedger::memory().unwrap();
        let other = ledger.clone();
        ledger.revoke("m-0001", None).unwrap();
        assert!(other.is_revoked("m-0001").unwrap());
    }
}

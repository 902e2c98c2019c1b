//! SQLite schema for the durable revocation ledger.

/// DDL for the revocation table.
///
/// `seq` preserves first-revocation order; an upsert keeps the original row.
pub const REVOCATION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS revocations (
    seq              INTEGER PRIMARY KEY AUTOINCREMENT,
    mandate_id       TEXT NOT NULL UNIQUE,
    revoked_at       TEXT NOT NULL,
    reason           TEXT
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_valid_sql() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(REVOCATION_SCHEMA).unwrap();
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(REVOCATION_SCHEMA).unwrap();
        conn.execute_batch(REVOCATION_SCHEMA).unwrap();
    }

    #[test]
    fn test_mandate_id_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(REVOCATION_SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO revocations (mandate_id, revoked_at) VALUES ('m-1', 'x')",
            [],
        )
        .unwrap();
        assert!(conn
            .execute(
                "INSERT INTO revocations (mandate_id, revoked_at) VALUES ('m-1', 'y')",
                [],
            )
            .is_err());
    }
}

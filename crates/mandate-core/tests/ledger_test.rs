use chrono::{TimeZone, Utc};
use mandate_core::ledger::{MemoryLedger, RevocationLedger, RevocationRecord, SqliteLedger};
use std::sync::Arc;
use std::thread;

fn ledgers() -> Vec<(&'static str, Box<dyn RevocationLedger>)> {
    vec![
        ("memory", Box::new(MemoryLedger::new())),
        ("sqlite", Box::new(SqliteLedger::memory().unwrap())),
    ]
}

#[test]
fn test_revoke_twice_same_as_once() {
    for (name, ledger) in ledgers() {
        ledger.revoke("m-0001", Some("first")).unwrap();
        ledger.revoke("m-0001", Some("second")).unwrap();

        assert!(ledger.is_revoked("m-0001").unwrap(), "{name}");
        let all = ledger.list_all().unwrap();
        assert_eq!(all.len(), 1, "{name}");
        assert_eq!(all[0].reason.as_deref(), Some("second"), "{name}");
    }
}

#[test]
fn test_record_with_explicit_timestamp() {
    let t = Utc.with_ymd_and_hms(2026, 2, 14, 9, 30, 0).unwrap();
    for (name, ledger) in ledgers() {
        ledger
            .record(RevocationRecord::new("m-0042", t).with_reason("fraud"))
            .unwrap();
        let got = ledger.get_revocation("m-0042").unwrap().unwrap();
        assert_eq!(got.revoked_at, t, "{name}");
        assert_eq!(got.reason.as_deref(), Some("fraud"), "{name}");
        assert_eq!(ledger.get_revocation("m-0043").unwrap(), None, "{name}");
    }
}

#[test]
fn test_clear_resets() {
    for (name, ledger) in ledgers() {
        ledger.revoke("m-a", None).unwrap();
        ledger.revoke("m-b", None).unwrap();
        ledger.clear().unwrap();
        assert!(ledger.list_all().unwrap().is_empty(), "{name}");
        assert!(!ledger.is_revoked("m-a").unwrap(), "{name}");
    }
}

#[test]
fn test_sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    {
        let ledger = SqliteLedger::open(&path).unwrap();
        ledger.revoke("m-0001", Some("persisted")).unwrap();
        ledger.revoke("m-0002", None).unwrap();
    }

    let reopened = SqliteLedger::open(&path).unwrap();
    assert!(reopened.is_revoked("m-0001").unwrap());
    let ids: Vec<_> = reopened
        .list_all()
        .unwrap()
        .into_iter()
        .map(|r| r.mandate_id)
        .collect();
    assert_eq!(ids, vec!["m-0001", "m-0002"]);
}

#[test]
fn test_concurrent_revocations_visible() {
    let ledger = Arc::new(SqliteLedger::memory().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                let id = format!("m-thread-{i}");
                ledger.revoke(&id, None).unwrap();
                assert!(ledger.is_revoked(&id).unwrap());
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(ledger.list_all().unwrap().len(), 8);
}

#[test]
fn test_memory_ledger_concurrent_same_id() {
    let ledger = Arc::new(MemoryLedger::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                ledger.revoke("m-shared", Some(&format!("writer {i}"))).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(ledger.list_all().unwrap().len(), 1);
}

//! End-to-end guard scenarios: sign, admit, exercise, revoke.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mandate_core::guard::{
    DenyReason, ExecutionDecision, MandateGuard, RejectionKind, Verification,
    REASON_SIGNATURE_INVALID,
};
use mandate_core::ledger::{MemoryLedger, RevocationLedger, SqliteLedger};
use mandate_core::mandate::{
    sign_mandate, AgentIdentity, CapPeriod, LineItem, MandateBody, MandateKind, SignedMandate,
    SpendCap, Timestamp,
};
use serde_json::{json, Value};

fn at(s: &str) -> DateTime<Utc> {
    Timestamp::parse(s).unwrap().instant()
}

fn groceries() -> MandateBody {
    MandateBody::new(
        "m-0001",
        MandateKind::Intent,
        "agent-1",
        "user-1",
        SpendCap::new(5000, "USD", CapPeriod::Daily),
        Timestamp::parse("2030-01-01T00:00:00Z").unwrap(),
    )
}

fn sign(body: MandateBody) -> (SignedMandate, Value) {
    let identity = AgentIdentity::generate();
    let signed = sign_mandate(body, &identity.signing_key).unwrap();
    let wire = serde_json::to_value(&signed).unwrap();
    (signed, wire)
}

fn admitted<L: RevocationLedger>(guard: &MandateGuard<L>, wire: &Value) -> SignedMandate {
    match guard.validate_and_verify(wire) {
        Verification::Valid { parsed } => parsed,
        other => panic!("expected valid mandate, got {other:?}"),
    }
}

#[test]
fn test_signed_mandate_is_admitted_and_allowed() {
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    let (_, wire) = sign(groceries());

    let parsed = admitted(&guard, &wire);
    assert_eq!(
        guard.guard_execution(&parsed, at("2025-01-01T00:00:00Z")),
        ExecutionDecision::Allowed
    );
}

#[test]
fn test_revoked_mandate_is_denied() {
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    let (_, wire) = sign(groceries());
    let parsed = admitted(&guard, &wire);

    guard.ledger().revoke("m-0001", Some("test")).unwrap();

    let decision = guard.guard_execution(&parsed, at("2025-01-01T00:00:00Z"));
    assert_eq!(
        decision,
        ExecutionDecision::Denied {
            reason: DenyReason::Revoked
        }
    );
    assert!(matches!(
        guard.validate_and_verify(&wire),
        Verification::Invalid {
            kind: RejectionKind::Revoked,
            ..
        }
    ));
}

#[test]
fn test_amount_changed_after_signing_is_rejected() {
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    let (_, mut wire) = sign(groceries());
    wire["payload"]["cap"]["amount"] = json!(50000);

    assert_eq!(
        guard.validate_and_verify(&wire),
        Verification::Invalid {
            kind: RejectionKind::Signature,
            reason: REASON_SIGNATURE_INVALID.to_string(),
        }
    );
}

#[test]
fn test_expired_mandate_verifies_but_is_denied() {
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    let mut body = groceries();
    body.expires_at = Timestamp::parse("2020-01-01T00:00:00Z").unwrap();
    let (_, wire) = sign(body);

    let parsed = admitted(&guard, &wire);
    assert_eq!(
        guard.guard_execution(&parsed, at("2025-01-01T00:00:00Z")),
        ExecutionDecision::Denied {
            reason: DenyReason::Expired
        }
    );
}

#[test]
fn test_missing_currency_is_schema_error() {
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    let (_, mut wire) = sign(groceries());
    wire["payload"]["cap"]
        .as_object_mut()
        .unwrap()
        .remove("currency");

    match guard.validate_and_verify(&wire) {
        Verification::Invalid { kind, reason } => {
            assert_eq!(kind, RejectionKind::Schema);
            assert!(reason.contains("currency"), "reason: {reason}");
        }
        other => panic!("expected schema failure, got {other:?}"),
    }
}

#[test]
fn test_reordered_cart_is_rejected() {
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    let mut body = groceries().with_line_items(vec![
        LineItem::new("apples", 3, 200, "USD"),
        LineItem::new("bread", 1, 450, "USD"),
    ]);
    body.kind = MandateKind::Cart;
    let (_, mut wire) = sign(body);
    admitted(&guard, &wire);

    let items = wire["payload"]["line_items"].as_array_mut().unwrap();
    items.swap(0, 1);
    assert_eq!(
        guard.validate_and_verify(&wire).reason(),
        Some(REASON_SIGNATURE_INVALID)
    );
}

#[test]
fn test_expiry_boundary_millisecond() {
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    let t = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let (signed, _) = sign(groceries());

    assert_eq!(
        guard.guard_execution(&signed, t),
        ExecutionDecision::Denied {
            reason: DenyReason::Expired
        }
    );
    assert!(guard
        .guard_execution(&signed, t - Duration::milliseconds(1))
        .is_allowed());
}

#[test]
fn test_not_before_boundary_millisecond() {
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    let t = Utc.with_ymd_and_hms(2029, 6, 1, 0, 0, 0).unwrap();
    let (signed, _) = sign(groceries().with_not_before(t));

    assert_eq!(
        guard.guard_execution(&signed, t - Duration::milliseconds(1)),
        ExecutionDecision::Denied {
            reason: DenyReason::BeforeNotBefore
        }
    );
    assert!(guard.guard_execution(&signed, t).is_allowed());
}

#[test]
fn test_revocation_reported_before_expiry_at_admission() {
    // Expired and revoked: admission reports revocation, not a time failure
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    let mut body = groceries();
    body.expires_at = Timestamp::parse("2020-01-01T00:00:00Z").unwrap();
    let (_, wire) = sign(body);
    guard.ledger().revoke("m-0001", None).unwrap();

    assert!(matches!(
        guard.validate_and_verify(&wire),
        Verification::Invalid {
            kind: RejectionKind::Revoked,
            ..
        }
    ));
}

#[test]
fn test_durable_ledger_shared_between_guards() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("revocations.db");
    let (signed, _) = sign(groceries());
    let now = at("2025-01-01T00:00:00Z");

    {
        let issuer_side = MandateGuard::with_ledger(SqliteLedger::open(&path).unwrap());
        assert!(issuer_side.guard_execution(&signed, now).is_allowed());
        issuer_side.ledger().revoke("m-0001", Some("card lost")).unwrap();
    }

    let merchant_side = MandateGuard::with_ledger(SqliteLedger::open(&path).unwrap());
    assert_eq!(
        merchant_side.guard_execution(&signed, now),
        ExecutionDecision::Denied {
            reason: DenyReason::Revoked
        }
    );
}

#[test]
fn test_non_object_inputs_never_panic() {
    let guard = MandateGuard::with_ledger(MemoryLedger::new());
    for candidate in [
        json!(null),
        json!(42),
        json!("mandate"),
        json!([]),
        json!({}),
        json!({"payload": null}),
    ] {
        assert!(!guard.validate_and_verify(&candidate).is_valid());
    }
}

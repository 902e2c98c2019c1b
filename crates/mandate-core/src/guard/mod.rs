//! Mandate guard.
//!
//! Renders allow/deny verdicts for signed mandates.
//!
//! Admission ([`MandateGuard::validate_and_verify`]), short-circuiting:
//! 1. Structural validation (raw text is first scanned for duplicate keys
//!    by [`MandateGuard::validate_and_verify_str`])
//! 2. Revocation lookup
//! 3. Signature over the canonical payload
//! 4. Trusted signer (only when the policy pins keys)
//!
//! Execution ([`MandateGuard::guard_execution`]):
//! 1. `not_before`
//! 2. `expires_at`
//! 3. Revocation re-check
//!
//! [`MandateGuard::guard_charge`] adds currency, spend cap and merchant
//! checks for a concrete charge. Ledger failures always deny.

mod charge;
mod checks;
mod policy;


pub use charge::ChargeRequest;
pub use policy::GuardPolicy;

use crate::ledger::{LedgerError, RevocationLedger};
use crate::mandate::{schema, signing, SignedMandate};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

pub const REASON_MANDATE_REVOKED: &str = "mandate revoked";
pub const REASON_SIGNATURE_INVALID: &str = "signature invalid";
pub const REASON_UNTRUSTED_SIGNER: &str = "untrusted signer";
pub const REASON_LEDGER_UNAVAILABLE: &str = "ledger unavailable";

/// Why admission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Schema,
    Revoked,
    LedgerUnavailable,
    Signature,
    UntrustedSigner,
}

/// Result of [`MandateGuard::validate_and_verify`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Valid { parsed: SignedMandate },
    Invalid { kind: RejectionKind, reason: String },
}

impl Verification {
    fn invalid(kind: RejectionKind, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason, .. } => Some(reason),
        }
    }
}

/// Why an execution was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    BeforeNotBefore,
    Expired,
    Revoked,
    LedgerUnavailable,
    CurrencyMismatch,
    ExceedsSpendCap,
    MerchantBlocked,
    MerchantNotAllowed,
}

impl DenyReason {
    /// Stable reason string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeNotBefore => "before not_before",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
            Self::LedgerUnavailable => REASON_LEDGER_UNAVAILABLE,
            Self::CurrencyMismatch => "currency mismatch",
            Self::ExceedsSpendCap => "exceeds spend cap",
            Self::MerchantBlocked => "merchant blocked",
            Self::MerchantNotAllowed => "merchant not allowed",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`MandateGuard::guard_execution`] and [`MandateGuard::guard_charge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionDecision {
    Allowed,
    Denied { reason: DenyReason },
}

impl ExecutionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    fn from_check(result: Result<(), DenyReason>) -> Self {
        match result {
            Ok(()) => Self::Allowed,
            Err(reason) => Self::Denied { reason },
        }
    }
}

/// Lifecycle state of a mandate at an instant.
///
/// `Revoked` is terminal and reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandateStatus {
    /// Before `not_before`
    Pending,
    Active,
    Expired,
    Revoked,
}

impl MandateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }
}

/// Stateless verdict engine over an injected revocation ledger.
#[derive(Debug, Clone)]
pub struct MandateGuard<L> {
    ledger: L,
    policy: GuardPolicy,
}

impl<L: RevocationLedger> MandateGuard<L> {
    pub fn new(ledger: L, policy: GuardPolicy) -> Self {
        Self { ledger, policy }
    }

    /// Guard with the default policy (no clock skew, any signer).
    pub fn with_ledger(ledger: L) -> Self {
        Self::new(ledger, GuardPolicy::default())
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Admit an untrusted envelope.
    ///
    /// Never panics or errors: every failure is an `Invalid` verdict.
    pub fn validate_and_verify(&self, candidate: &Value) -> Verification {
        let verdict = self.validate_and_verify_inner(candidate);
        if let Verification::Invalid { kind, reason } = &verdict {
            tracing::debug!(?kind, reason = %reason, "mandate rejected");
        }
        verdict
    }

    /// Admit untrusted envelope text.
    ///
    /// Text that is not JSON, or that repeats a key in any object, is a
    /// schema rejection.
    pub fn validate_and_verify_str(&self, raw: &str) -> Verification {
        match schema::parse_strict(raw) {
            Ok(candidate) => self.validate_and_verify(&candidate),
            Err(e) => {
                let verdict = Verification::invalid(RejectionKind::Schema, e.to_string());
                tracing::debug!(kind = ?RejectionKind::Schema, reason = %e, "mandate rejected");
                verdict
            }
        }
    }

    fn validate_and_verify_inner(&self, candidate: &Value) -> Verification {
        let parsed = match schema::validate(candidate) {
            Ok(parsed) => parsed,
            Err(errors) => return Verification::invalid(RejectionKind::Schema, errors.to_string()),
        };
        let mandate_id = parsed.mandate_id();

        match self.ledger.is_revoked(mandate_id) {
            Ok(false) => {}
            Ok(true) => {
                return Verification::invalid(RejectionKind::Revoked, REASON_MANDATE_REVOKED)
            }
            Err(e) => {
                tracing::warn!(mandate_id, error = %e, "revocation lookup failed");
                return Verification::invalid(
                    RejectionKind::LedgerUnavailable,
                    REASON_LEDGER_UNAVAILABLE,
                );
            }
        }

        if !signing::verify(&parsed.pubkey, &parsed.signature, &parsed.payload) {
            return Verification::invalid(RejectionKind::Signature, REASON_SIGNATURE_INVALID);
        }

        if !self.policy.is_pubkey_trusted(&parsed.pubkey) {
            return Verification::invalid(
                RejectionKind::UntrustedSigner,
                REASON_UNTRUSTED_SIGNER,
            );
        }

        tracing::debug!(mandate_id, "mandate verified");
        Verification::Valid { parsed }
    }

    /// Decide whether a verified mandate may be exercised at `now`.
    pub fn guard_execution(&self, mandate: &SignedMandate, now: DateTime<Utc>) -> ExecutionDecision {
        let decision = ExecutionDecision::from_check(self.execution_checks(mandate, now));
        tracing::debug!(
            mandate_id = mandate.mandate_id(),
            ?decision,
            "execution guarded"
        );
        decision
    }

    /// [`guard_execution`](Self::guard_execution) plus checks on a concrete charge.
    pub fn guard_charge(
        &self,
        mandate: &SignedMandate,
        charge: &ChargeRequest,
        now: DateTime<Utc>,
    ) -> ExecutionDecision {
        let result = self
            .execution_checks(mandate, now)
            .and_then(|()| checks::check_charge_impl(&mandate.payload, charge));
        let decision = ExecutionDecision::from_check(result);
        tracing::debug!(
            mandate_id = mandate.mandate_id(),
            amount = charge.amount,
            currency = %charge.currency,
            ?decision,
            "charge guarded"
        );
        decision
    }

    fn execution_checks(&self, mandate: &SignedMandate, now: DateTime<Utc>) -> Result<(), DenyReason> {
        checks::check_window_impl(now, &mandate.payload, self.policy.clock_skew())?;
        checks::check_revocation_impl(&self.ledger, mandate.mandate_id())
    }

    /// Lifecycle state at `now`. Revocation wins over every time-based state.
    pub fn status_at(
        &self,
        mandate: &SignedMandate,
        now: DateTime<Utc>,
    ) -> Result<MandateStatus, LedgerError> {
        if self.ledger.is_revoked(mandate.mandate_id())? {
            return Ok(MandateStatus::Revoked);
        }
        let status = match checks::check_window_impl(now, &mandate.payload, self.policy.clock_skew())
        {
            Ok(()) => MandateStatus::Active,
            Err(DenyReason::BeforeNotBefore) => MandateStatus::Pending,
            Err(_) => MandateStatus::Expired,
        };
        Ok(status)
    }
}

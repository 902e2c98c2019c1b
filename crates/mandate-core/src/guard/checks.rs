use super::{ChargeRequest, DenyReason};
use crate::ledger::RevocationLedger;
use crate::mandate::{MandateBody, MerchantVerdict};
use chrono::{DateTime, Duration, Utc};

/// Half-open window `[not_before, expires_at)`, each edge widened by `skew`.
pub(super) fn check_window_impl(
    now: DateTime<Utc>,
    body: &MandateBody,
    skew: Duration,
) -> Result<(), DenyReason> {
    if let Some(not_before) = &body.not_before {
        if now < not_before.instant() - skew {
            return Err(DenyReason::BeforeNotBefore);
        }
    }
    if now >= body.expires_at.instant() + skew {
        return Err(DenyReason::Expired);
    }
    Ok(())
}

pub(super) fn check_revocation_impl<L: RevocationLedger + ?Sized>(
    ledger: &L,
    mandate_id: &str,
) -> Result<(), DenyReason> {
    match ledger.is_revoked(mandate_id) {
        Ok(false) => Ok(()),
        Ok(true) => Err(DenyReason::Revoked),
        Err(e) => {
            tracing::warn!(mandate_id, error = %e, "revocation lookup failed");
            Err(DenyReason::LedgerUnavailable)
        }
    }
}

pub(super) fn check_charge_impl(
    body: &MandateBody,
    charge: &ChargeRequest,
) -> Result<(), DenyReason> {
    if charge.currency != body.cap.currency {
        return Err(DenyReason::CurrencyMismatch);
    }
    if charge.amount > body.cap.amount {
        return Err(DenyReason::ExceedsSpendCap);
    }
    check_merchant_impl(body, charge.merchant.as_deref())
}

/// A charge without a merchant passes a block list but never an allow list.
pub(super) fn check_merchant_impl(
    body: &MandateBody,
    merchant: Option<&str>,
) -> Result<(), DenyReason> {
    let verdict = match merchant {
        Some(m) => body.merchant_verdict(m),
        None if body.merchant_allow.is_some() => MerchantVerdict::NotAllowed,
        None => MerchantVerdict::Permitted,
    };
    match verdict {
        MerchantVerdict::Permitted => Ok(()),
        MerchantVerdict::Blocked => Err(DenyReason::MerchantBlocked),
        MerchantVerdict::NotAllowed => Err(DenyReason::MerchantNotAllowed),
    }
}

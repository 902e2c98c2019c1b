//! Mandate data model.
//!
//! Core data structures for signed, time-boxed, spend-capped payment
//! authorizations issued by a holder to an autonomous agent.
//!
//! # Design Principles
//!
//! - **Wire-faithful** - Re-serializing a parsed payload reproduces the signed
//!   bytes (timestamps keep their original text, arrays keep their order)
//! - **Closed shapes** - Unknown fields are rejected, never ignored
//! - **Offline-verifiable** - Verification requires only the embedded public key

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Mandate kind.
///
/// | Kind | Purpose |
/// |------|---------|
/// | `Intent` | Standing authority to shop within a cap |
/// | `Cart` | Authorization bound to concrete line items |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MandateKind {
    #[default]
    Intent,
    Cart,
}

impl MandateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Cart => "cart",
        }
    }
}

/// Period over which a spend cap applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapPeriod {
    Single,
    Daily,
    Weekly,
    Monthly,
}

impl CapPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// Maximum the agent may spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpendCap {
    /// Amount in minor currency units (cents for USD)
    pub amount: u64,

    /// Currency code, e.g. "USD"
    pub currency: String,

    pub period: CapPeriod,
}

impl SpendCap {
    pub fn new(amount: u64, currency: impl Into<String>, period: CapPeriod) -> Self {
        Self {
            amount,
            currency: currency.into(),
            period,
        }
    }
}

/// One entry of a cart mandate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineItem {
    pub sku: String,

    /// Quantity (MUST be > 0)
    pub qty: u64,

    /// Unit price in minor currency units
    pub unit_amount: u64,

    pub currency: String,
}

impl LineItem {
    pub fn new(
        sku: impl Into<String>,
        qty: u64,
        unit_amount: u64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            sku: sku.into(),
            qty,
            unit_amount,
            currency: currency.into(),
        }
    }

    /// `qty * unit_amount`, or `None` on overflow.
    pub fn subtotal(&self) -> Option<u64> {
        self.qty.checked_mul(self.unit_amount)
    }
}

/// Sum of line item subtotals, or `None` on overflow.
pub fn line_items_total(items: &[LineItem]) -> Option<u64> {
    items
        .iter()
        .try_fold(0u64, |acc, item| acc.checked_add(item.subtotal()?))
}

/// An ISO-8601 / RFC 3339 instant that remembers its original text.
///
/// Signatures cover the canonical JSON of the payload, so a timestamp must
/// serialize back to exactly the string the signer produced
/// (`2030-01-01T00:00:00.000Z` and `2030-01-01T00:00:00Z` are different bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    instant: DateTime<Utc>,
}

impl Timestamp {
    /// Parse an RFC 3339 timestamp, keeping the input text.
    pub fn parse(raw: &str) -> Result<Self, chrono::ParseError> {
        let instant = DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc);
        Ok(Self {
            raw: raw.to_string(),
            instant,
        })
    }

    /// Build from an instant, rendered as UTC with a `Z` suffix.
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self {
            raw: instant.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            instant,
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::from_datetime(instant)
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(|e| {
            serde::de::Error::custom(format!("invalid ISO-8601 timestamp '{raw}': {e}"))
        })
    }
}

/// Outcome of matching a merchant against a mandate's merchant lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MerchantVerdict {
    Permitted,
    /// Merchant is on the block list
    Blocked,
    /// An allow list exists and the merchant is not on it
    NotAllowed,
}

/// The signed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MandateBody {
    /// Unique identifier (>= 4 chars)
    pub mandate_id: String,

    pub kind: MandateKind,

    /// Delegate agent acting under the mandate
    pub agent: String,

    /// Principal who authorized the mandate
    pub holder: String,

    pub cap: SpendCap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_allow: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_block: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<Timestamp>,

    pub expires_at: Timestamp,

    /// Ordered; reordering changes the signed bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_url: Option<String>,
}

impl MandateBody {
    /// Create a body with the required fields.
    pub fn new(
        mandate_id: impl Into<String>,
        kind: MandateKind,
        agent: impl Into<String>,
        holder: impl Into<String>,
        cap: SpendCap,
        expires_at: impl Into<Timestamp>,
    ) -> Self {
        Self {
            mandate_id: mandate_id.into(),
            kind,
            agent: agent.into(),
            holder: holder.into(),
            cap,
            merchant_allow: None,
            merchant_block: None,
            not_before: None,
            expires_at: expires_at.into(),
            line_items: None,
            total_amount: None,
            meta: None,
            revocation_url: None,
        }
    }

    pub fn with_not_before(mut self, not_before: impl Into<Timestamp>) -> Self {
        self.not_before = Some(not_before.into());
        self
    }

    pub fn with_merchant_allow(mut self, merchants: Vec<String>) -> Self {
        self.merchant_allow = Some(merchants);
        self
    }

    pub fn with_merchant_block(mut self, merchants: Vec<String>) -> Self {
        self.merchant_block = Some(merchants);
        self
    }

    /// Set line items and the matching `total_amount`.
    pub fn with_line_items(mut self, items: Vec<LineItem>) -> Self {
        self.total_amount = line_items_total(&items);
        self.line_items = Some(items);
        self
    }

    pub fn with_meta(mut self, meta: serde_json::Map<String, serde_json::Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_revocation_url(mut self, url: impl Into<String>) -> Self {
        self.revocation_url = Some(url.into());
        self
    }

    /// Check a merchant against the block and allow lists.
    ///
    /// The block list always excludes; when an allow list is present the
    /// merchant must also appear on it.
    pub fn merchant_verdict(&self, merchant: &str) -> MerchantVerdict {
        if let Some(block) = &self.merchant_block {
            if block.iter().any(|m| m == merchant) {
                return MerchantVerdict::Blocked;
            }
        }
        match &self.merchant_allow {
            Some(allow) if !allow.iter().any(|m| m == merchant) => MerchantVerdict::NotAllowed,
            _ => MerchantVerdict::Permitted,
        }
    }
}

/// Signature algorithm tag.
///
/// Only Ed25519 exists today; the tag is an enum so a second scheme is an
/// additive change to the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SignatureAlgorithm {
    #[default]
    #[serde(rename = "ed25519")]
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
        }
    }
}

/// The signed envelope exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignedMandate {
    pub alg: SignatureAlgorithm,

    /// Base64 (standard, padded) Ed25519 public key
    pub pubkey: String,

    /// Base64 (standard, padded) Ed25519 signature over the canonical payload
    pub signature: String,

    pub payload: MandateBody,
}

impl SignedMandate {
    pub fn mandate_id(&self) -> &str {
        &self.payload.mandate_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn body() -> MandateBody {
        MandateBody::new(
            "m-0001",
            MandateKind::Intent,
            "agent-1",
            "user-1",
            SpendCap::new(5000, "USD", CapPeriod::Daily),
            Timestamp::parse("2030-01-01T00:00:00Z").unwrap(),
        )
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&MandateKind::Intent).unwrap(),
            "\"intent\""
        );
        assert_eq!(serde_json::to_string(&MandateKind::Cart).unwrap(), "\"cart\"");
        assert_eq!(
            serde_json::to_string(&CapPeriod::Monthly).unwrap(),
            "\"monthly\""
        );
        assert_eq!(
            serde_json::to_string(&SignatureAlgorithm::Ed25519).unwrap(),
            "\"ed25519\""
        );
    }

    #[test]
    fn test_timestamp_preserves_text() {
        let ts = Timestamp::parse("2030-01-01T00:00:00.000Z").unwrap();
        assert_eq!(ts.as_str(), "2030-01-01T00:00:00.000Z");
        assert_eq!(
            ts.instant(),
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&ts).unwrap(),
            "\"2030-01-01T00:00:00.000Z\""
        );
    }

    #[test]
    fn test_timestamp_offset_normalized_to_utc() {
        let ts = Timestamp::parse("2030-01-01T02:00:00+02:00").unwrap();
        assert_eq!(
            ts.instant(),
            Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(ts.as_str(), "2030-01-01T02:00:00+02:00");
    }

    #[test]
    fn test_timestamp_from_datetime() {
        let ts = Timestamp::from(Utc.with_ymd_and_hms(2026, 1, 28, 12, 0, 0).unwrap());
        assert_eq!(ts.as_str(), "2026-01-28T12:00:00Z");
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert!(Timestamp::parse("tomorrow").is_err());
        assert!(Timestamp::parse("2030-01-01").is_err());
    }

    #[test]
    fn test_optional_fields_omitted() {
        let json = serde_json::to_value(body()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("not_before"));
        assert!(!obj.contains_key("line_items"));
        assert!(!obj.contains_key("meta"));
        assert_eq!(obj["expires_at"], "2030-01-01T00:00:00Z");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let mut json = serde_json::to_value(body()).unwrap();
        json["surprise"] = serde_json::json!(true);
        assert!(serde_json::from_value::<MandateBody>(json).is_err());
    }

    #[test]
    fn test_line_items_total() {
        let items = vec![
            LineItem::new("sku-a", 2, 1250, "USD"),
            LineItem::new("sku-b", 1, 500, "USD"),
        ];
        assert_eq!(line_items_total(&items), Some(3000));
        assert_eq!(line_items_total(&[]), Some(0));

        let overflow = vec![LineItem::new("big", u64::MAX, 2, "USD")];
        assert_eq!(line_items_total(&overflow), None);
    }

    #[test]
    fn test_with_line_items_sets_total() {
        let b = body().with_line_items(vec![LineItem::new("sku-a", 3, 100, "USD")]);
        assert_eq!(b.total_amount, Some(300));
    }

    #[test]
    fn test_merchant_verdict() {
        let open = body();
        assert_eq!(open.merchant_verdict("any"), MerchantVerdict::Permitted);

        let allow = body().with_merchant_allow(vec!["shop-a".into()]);
        assert_eq!(allow.merchant_verdict("shop-a"), MerchantVerdict::Permitted);
        assert_eq!(allow.merchant_verdict("shop-b"), MerchantVerdict::NotAllowed);

        let block = body().with_merchant_block(vec!["shop-x".into()]);
        assert_eq!(block.merchant_verdict("shop-x"), MerchantVerdict::Blocked);
        assert_eq!(block.merchant_verdict("shop-a"), MerchantVerdict::Permitted);

        // Block excludes even when the merchant is also allow-listed
        let both = body()
            .with_merchant_allow(vec!["shop-a".into()])
            .with_merchant_block(vec!["shop-a".into()]);
        assert_eq!(both.merchant_verdict("shop-a"), MerchantVerdict::Blocked);
    }
}

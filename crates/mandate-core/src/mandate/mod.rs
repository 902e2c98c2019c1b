//! Payment mandates.
//!
//! A mandate is a signed, time-boxed, spend-capped authorization for an
//! autonomous agent to spend on a holder's behalf.
//!
//! # Mandate Kinds
//!
//! | Kind | Purpose | Typical Use |
//! |------|---------|-------------|
//! | `Intent` | Standing authority within a cap | "Buy groceries under $50/day" |
//! | `Cart` | Authorization of concrete line items | Checkout of a reviewed basket |
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use mandate_core::mandate::{
//!     schema, sign_mandate, verify_mandate, CapPeriod, MandateBody, MandateKind, SpendCap,
//! };
//! use ed25519_dalek::SigningKey;
//!
//! let key = SigningKey::from_bytes(&[1u8; 32]);
//! let body = MandateBody::new(
//!     "m-groceries-01",
//!     MandateKind::Intent,
//!     "shopping-agent",
//!     "alice",
//!     SpendCap::new(5_000, "USD", CapPeriod::Daily),
//!     Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
//! );
//!
//! let signed = sign_mandate(body, &key).unwrap();
//! assert!(verify_mandate(&signed));
//!
//! // The wire form passes structural validation
//! let wire = serde_json::to_value(&signed).unwrap();
//! assert!(schema::validate(&wire).is_ok());
//! ```

pub mod schema;
pub mod signing;
pub mod types;

pub use schema::{validate, validate_body, SchemaErrors, SchemaIssue};
pub use signing::{
    load_signing_key_pem, payload_digest, public_key_from_secret, sign, sign_mandate,
    signing_key_from_base64, signing_key_to_pem, verify, verify_mandate, AgentIdentity, KeyError,
};
pub use types::{
    line_items_total, CapPeriod, LineItem, MandateBody, MandateKind, MerchantVerdict,
    SignatureAlgorithm, SignedMandate, SpendCap, Timestamp,
};

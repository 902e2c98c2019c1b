//! Strict JSON ingest.
//!
//! serde_json accepts duplicate object keys and keeps the last one. Other
//! parsers keep the first. For a signed envelope that means two readers can
//! disagree about which mandate was authorized:
//!
//! ```text
//! {"mandate_id": "m-0001", "mandate_id": "m-evil"}
//! first-wins reader:  m-0001
//! last-wins reader:   m-evil
//! ```
//!
//! Documents are therefore scanned before deserialization and refused when
//! any object repeats a member name. Names are compared after escape
//! decoding (`\uXXXX`, surrogate pairs, `\n`, `\/` and friends), not after
//! Unicode normalization: `"\u00E9"` and `"e\u0301"` are distinct.
//!
//! The scan also bounds resource use:
//! - nesting depth [`MAX_NESTING_DEPTH`]
//! - members per object [`MAX_KEYS_PER_OBJECT`]
//! - decoded string length [`MAX_STRING_LENGTH`]
//!
//! ```
//! use mandate_core::json_strict::{check_strict, from_str_strict};
//!
//! assert!(check_strict(r#"{"amount": 1, "amount": 2}"#).is_err());
//! assert!(check_strict(r#"{"a": 1, "\u0061": 2}"#).is_err());
//!
//! let v: serde_json::Value = from_str_strict(r#"{"amount": 1}"#).unwrap();
//! assert_eq!(v["amount"], 1);
//! ```

mod dupkeys;
mod errors;
mod scan;

pub use errors::{StrictJsonError, MAX_KEYS_PER_OBJECT, MAX_NESTING_DEPTH, MAX_STRING_LENGTH};

use serde::de::DeserializeOwned;

/// Deserialize `s` after it passes [`check_strict`].
pub fn from_str_strict<T: DeserializeOwned>(s: &str) -> Result<T, StrictJsonError> {
    check_strict(s)?;
    Ok(serde_json::from_str(s)?)
}

/// Scan `s` for duplicate keys, lone surrogates and limit violations
/// without deserializing it.
pub fn check_strict(s: &str) -> Result<(), StrictJsonError> {
    scan::Scanner::new(s).run()
}

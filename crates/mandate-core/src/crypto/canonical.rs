//! Canonical JSON serialization for signing.
//!
//! Signer and verifier both canonicalize the payload before touching the
//! signature, so this byte form is the only compatibility surface between
//! implementations:
//!
//! - Object keys sorted lexicographically by Unicode code point
//! - Array order preserved
//! - Scalars emitted unchanged
//! - Compact UTF-8 JSON, no insignificant whitespace
//!
//! Numbers use serde_json's formatting. For integers within ±(2^53 - 1)
//! that matches ECMAScript `JSON.stringify`; floats and larger integers
//! differ, which is why mandate payloads only admit that range
//! (see [`crate::mandate::schema`]).
//!
//! The canonical form is never transmitted; each endpoint recomputes it.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Return a copy of `value` with every object's keys in code-point order.
///
/// Rust `String` ordering is UTF-8 byte order, which coincides with
/// code-point order.
pub fn canonicalize_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_value).collect()),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, inner) in entries {
                sorted.insert(key.clone(), canonicalize_value(inner));
            }
            Value::Object(sorted)
        }
        other => other.clone(),
    }
}

/// Serialize a value to canonical JSON bytes.
///
/// # Example
///
/// ```
/// use mandate_core::crypto::canonical;
/// use serde_json::json;
///
/// let bytes = canonical::to_vec(&json!({"b": 2, "a": [3, 1]})).unwrap();
/// assert_eq!(bytes, br#"{"a":[3,1],"b":2}"#);
/// ```
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let tree = serde_json::to_value(value).context("failed to convert value to json")?;
    serde_json::to_vec(&canonicalize_value(&tree)).context("failed to serialize canonical json")
}

/// Serialize a value to a canonical JSON string.
pub fn to_string<T: Serialize>(value: &T) -> Result<String> {
    let tree = serde_json::to_value(value).context("failed to convert value to json")?;
    serde_json::to_string(&canonicalize_value(&tree))
        .context("failed to serialize canonical json string")
}

/// Content digest of the canonical form.
///
/// Returns `sha256:<lowercase-hex>`.
pub fn digest<T: Serialize>(value: &T) -> Result<String> {
    let bytes = to_vec(value)?;
    Ok(format!("sha256:{}", hex::encode(Sha256::digest(&bytes))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_ordering() {
        let input = json!({"z": 3, "b": 2, "a": 1, "m": 4});
        assert_eq!(to_string(&input).unwrap(), r#"{"a":1,"b":2,"m":4,"z":3}"#);
    }

    #[test]
    fn test_nested_ordering() {
        let input = json!({
            "outer": {"z": 1, "a": 2},
            "first": true
        });
        assert_eq!(
            to_string(&input).unwrap(),
            r#"{"first":true,"outer":{"a":2,"z":1}}"#
        );
    }

    #[test]
    fn test_objects_inside_arrays_sorted() {
        let input = json!([{"b": 1, "a": 2}, {"d": null, "c": "x"}]);
        assert_eq!(
            to_string(&input).unwrap(),
            r#"[{"a":2,"b":1},{"c":"x","d":null}]"#
        );
    }

    #[test]
    fn test_array_order_preserved() {
        let input = json!({"array": [3, 1, 2]});
        assert_eq!(to_string(&input).unwrap(), r#"{"array":[3,1,2]}"#);
    }

    #[test]
    fn test_no_whitespace() {
        let input = json!({"key": "value with spaces", "array": [1, 2, 3]});
        let canonical = to_string(&input).unwrap();
        assert!(!canonical.contains('\n'));
        assert!(!canonical.contains(", "));
        assert!(!canonical.contains("\": "));
    }

    #[test]
    fn test_code_point_ordering() {
        // Uppercase sorts before lowercase; multi-byte after ASCII
        let input = json!({"é": 1, "b": 2, "B": 3, "a": 4});
        assert_eq!(
            to_string(&input).unwrap(),
            r#"{"B":3,"a":4,"b":2,"é":1}"#
        );
    }

    #[test]
    fn test_unicode_is_utf8() {
        let input = json!({"emoji": "🔒", "chinese": "中文"});
        let bytes = to_vec(&input).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.contains("🔒"));
        assert!(s.contains("中文"));
    }

    #[test]
    fn test_determinism_across_construction_order() {
        let mut first = Map::new();
        first.insert("a".into(), json!(1));
        first.insert("b".into(), json!({"y": 2, "x": 1}));

        let mut second = Map::new();
        second.insert("b".into(), json!({"x": 1, "y": 2}));
        second.insert("a".into(), json!(1));

        assert_eq!(
            to_vec(&Value::Object(first)).unwrap(),
            to_vec(&Value::Object(second)).unwrap()
        );
    }

    #[test]
    fn test_safe_integers_match_ecmascript_form() {
        let input = json!({"max": 9_007_199_254_740_991u64, "min": -9_007_199_254_740_991i64, "zero": 0});
        assert_eq!(
            to_string(&input).unwrap(),
            r#"{"max":9007199254740991,"min":-9007199254740991,"zero":0}"#
        );
    }

    #[test]
    fn test_digest_format() {
        let d = digest(&json!({"a": 1})).unwrap();
        assert!(d.starts_with("sha256:"));
        assert_eq!(d.len(), 71);
        assert_eq!(d, digest(&json!({"a": 1})).unwrap());
    }
}

//! Structural validation of mandate envelopes.
//!
//! Walks an untrusted `serde_json::Value` and collects every violation with
//! its field path (`payload.cap.currency`, `payload.line_items[1].qty`)
//! before anything is deserialized. Validation fails closed: unknown fields,
//! explicit `null` for optional fields and wrong types are all errors.
//!
//! Signature material is only checked for presence here. Decoding problems
//! are cryptographic failures and belong to the signature engine, so the two
//! failure kinds stay distinguishable.
//!
//! Raw text should enter through [`parse_strict`], which refuses duplicate
//! object keys before a `Value` is ever built.
//!
//! Every number in a payload, `meta` included, must be an integer within
//! ±[`MAX_SAFE_INTEGER`]. Inside that range serde_json and ECMAScript
//! `JSON.stringify` print numbers identically, so canonical bytes agree
//! across signer implementations.

use crate::json_strict::{self, StrictJsonError};
use crate::mandate::types::{MandateBody, SignedMandate, Timestamp};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Minimum length of a `mandate_id`.
pub const MIN_MANDATE_ID_LEN: usize = 4;

/// Maximum length of a `mandate_id`.
pub const MAX_MANDATE_ID_LEN: usize = 256;

/// Largest integer a payload may carry (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

const ENVELOPE_FIELDS: &[&str] = &["alg", "pubkey", "signature", "payload"];
const BODY_FIELDS: &[&str] = &[
    "mandate_id",
    "kind",
    "agent",
    "holder",
    "cap",
    "merchant_allow",
    "merchant_block",
    "not_before",
    "expires_at",
    "line_items",
    "total_amount",
    "meta",
    "revocation_url",
];
const CAP_FIELDS: &[&str] = &["amount", "currency", "period"];
const LINE_ITEM_FIELDS: &[&str] = &["sku", "qty", "unit_amount", "currency"];

const ALGORITHMS: &[&str] = &["ed25519"];
const KINDS: &[&str] = &["intent", "cart"];
const PERIODS: &[&str] = &["single", "daily", "weekly", "monthly"];

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Dotted field path; `$` is the document root
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Non-empty list of validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaErrors {
    issues: Vec<SchemaIssue>,
}

impl SchemaErrors {
    pub fn issues(&self) -> &[SchemaIssue] {
        &self.issues
    }

    /// True if any issue is reported at `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaErrors {}

/// Parse untrusted envelope text, refusing duplicate keys.
pub fn parse_strict(raw: &str) -> Result<Value, StrictJsonError> {
    json_strict::from_str_strict(raw)
}

/// Validate a candidate envelope.
pub fn validate(candidate: &Value) -> Result<SignedMandate, SchemaErrors> {
    let mut c = Collector::default();
    check_envelope(&mut c, candidate);
    c.finish(candidate)
}

/// Validate a bare payload (what a signer is about to sign).
pub fn validate_body(candidate: &Value) -> Result<MandateBody, SchemaErrors> {
    let mut c = Collector::default();
    check_body(&mut c, "", candidate);
    c.finish(candidate)
}

#[derive(Default)]
struct Collector {
    issues: Vec<SchemaIssue>,
}

impl Collector {
    fn push(&mut self, path: &str, message: impl Into<String>) {
        let path = if path.is_empty() { "$" } else { path };
        self.issues.push(SchemaIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn finish<T: serde::de::DeserializeOwned>(self, candidate: &Value) -> Result<T, SchemaErrors> {
        if !self.issues.is_empty() {
            return Err(SchemaErrors {
                issues: self.issues,
            });
        }
        // Every shape rule has already passed; a serde failure here still
        // rejects rather than falling through.
        serde_json::from_value(candidate.clone()).map_err(|e| SchemaErrors {
            issues: vec![SchemaIssue {
                path: "$".to_string(),
                message: e.to_string(),
            }],
        })
    }

    fn object<'a>(&mut self, path: &str, value: &'a Value) -> Option<&'a Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            other => {
                self.push(path, format!("expected object, got {}", type_name(other)));
                None
            }
        }
    }

    fn reject_unknown(&mut self, path: &str, map: &Map<String, Value>, allowed: &[&str]) {
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.push(&child(path, key), "unknown field");
            }
        }
    }

    fn required<'a>(
        &mut self,
        path: &str,
        map: &'a Map<String, Value>,
        key: &str,
    ) -> Option<&'a Value> {
        match map.get(key) {
            Some(v) => Some(v),
            None => {
                self.push(&child(path, key), "missing required field");
                None
            }
        }
    }

    fn optional<'a>(
        &mut self,
        path: &str,
        map: &'a Map<String, Value>,
        key: &str,
    ) -> Option<&'a Value> {
        match map.get(key) {
            Some(Value::Null) => {
                self.push(&child(path, key), "must be omitted rather than null");
                None
            }
            other => other,
        }
    }

    fn string<'a>(&mut self, path: &str, value: &'a Value) -> Option<&'a str> {
        match value {
            Value::String(s) => Some(s),
            other => {
                self.push(path, format!("expected string, got {}", type_name(other)));
                None
            }
        }
    }

    fn non_empty_string<'a>(&mut self, path: &str, value: &'a Value) -> Option<&'a str> {
        let s = self.string(path, value)?;
        if s.trim().is_empty() {
            self.push(path, "must not be empty");
            return None;
        }
        Some(s)
    }

    fn enumeration(&mut self, path: &str, value: &Value, allowed: &[&str]) {
        if let Some(s) = self.string(path, value) {
            if !allowed.contains(&s) {
                self.push(
                    path,
                    format!("invalid value '{s}', expected one of: {}", allowed.join(", ")),
                );
            }
        }
    }

    /// Non-negative integer no larger than [`MAX_SAFE_INTEGER`].
    fn amount(&mut self, path: &str, value: &Value) -> Option<u64> {
        match value {
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    if v > MAX_SAFE_INTEGER {
                        self.push(path, format!("must not exceed {MAX_SAFE_INTEGER}"));
                        return None;
                    }
                    Some(v)
                } else if n.as_i64().is_some() {
                    self.push(path, "must be non-negative");
                    None
                } else {
                    self.push(path, "must be an integer");
                    None
                }
            }
            other => {
                self.push(path, format!("expected integer, got {}", type_name(other)));
                None
            }
        }
    }

    fn timestamp(&mut self, path: &str, value: &Value) -> Option<Timestamp> {
        let s = self.string(path, value)?;
        match Timestamp::parse(s) {
            Ok(ts) => Some(ts),
            Err(e) => {
                self.push(path, format!("invalid ISO-8601 timestamp: {e}"));
                None
            }
        }
    }

    fn currency(&mut self, path: &str, value: &Value) {
        if let Some(s) = self.string(path, value) {
            if !is_currency_code(s) {
                self.push(path, "must be a 3-10 character alphanumeric currency code");
            }
        }
    }
}

fn check_envelope(c: &mut Collector, value: &Value) {
    let Some(map) = c.object("", value) else {
        return;
    };
    c.reject_unknown("", map, ENVELOPE_FIELDS);

    if let Some(alg) = c.required("", map, "alg") {
        if let Some(s) = c.string("alg", alg) {
            if !ALGORITHMS.contains(&s) {
                c.push("alg", format!("unsupported algorithm '{s}', expected ed25519"));
            }
        }
    }
    if let Some(pubkey) = c.required("", map, "pubkey") {
        c.non_empty_string("pubkey", pubkey);
    }
    if let Some(signature) = c.required("", map, "signature") {
        c.non_empty_string("signature", signature);
    }
    if let Some(payload) = c.required("", map, "payload") {
        check_body(c, "payload", payload);
    }
}

fn check_body(c: &mut Collector, path: &str, value: &Value) {
    let Some(map) = c.object(path, value) else {
        return;
    };
    c.reject_unknown(path, map, BODY_FIELDS);

    if let Some(v) = c.required(path, map, "mandate_id") {
        let p = child(path, "mandate_id");
        if let Some(id) = c.string(&p, v) {
            if let Err(msg) = check_mandate_id(id) {
                c.push(&p, msg);
            }
        }
    }

    if let Some(v) = c.required(path, map, "kind") {
        c.enumeration(&child(path, "kind"), v, KINDS);
    }

    for key in ["agent", "holder"] {
        if let Some(v) = c.required(path, map, key) {
            c.non_empty_string(&child(path, key), v);
        }
    }

    if let Some(v) = c.required(path, map, "cap") {
        check_cap(c, &child(path, "cap"), v);
    }

    for key in ["merchant_allow", "merchant_block"] {
        if let Some(v) = c.optional(path, map, key) {
            check_merchant_list(c, &child(path, key), v);
        }
    }

    let not_before = c
        .optional(path, map, "not_before")
        .and_then(|v| c.timestamp(&child(path, "not_before"), v));
    let expires_at = c
        .required(path, map, "expires_at")
        .and_then(|v| c.timestamp(&child(path, "expires_at"), v));
    if let (Some(nb), Some(exp)) = (&not_before, &expires_at) {
        if nb.instant() >= exp.instant() {
            c.push(
                &child(path, "not_before"),
                "must be earlier than expires_at",
            );
        }
    }

    // None when absent or when any item failed; reconciliation then skips.
    let items_total = c
        .optional(path, map, "line_items")
        .map(|v| check_line_items(c, &child(path, "line_items"), v));

    let total = c
        .optional(path, map, "total_amount")
        .and_then(|v| c.amount(&child(path, "total_amount"), v));

    if let (Some(Some(sum)), Some(total)) = (items_total, total) {
        match sum {
            Some(sum) if sum != total => c.push(
                &child(path, "total_amount"),
                format!("does not match line_items total {sum}"),
            ),
            Some(_) => {}
            None => c.push(&child(path, "line_items"), "line item total overflows"),
        }
    }

    if let Some(v) = c.optional(path, map, "meta") {
        let p = child(path, "meta");
        if c.object(&p, v).is_some() {
            check_meta_numbers(c, &p, v);
        }
    }

    if let Some(v) = c.optional(path, map, "revocation_url") {
        let p = child(path, "revocation_url");
        if let Some(s) = c.string(&p, v) {
            if let Err(msg) = check_url(s) {
                c.push(&p, msg);
            }
        }
    }
}

fn check_cap(c: &mut Collector, path: &str, value: &Value) {
    let Some(map) = c.object(path, value) else {
        return;
    };
    c.reject_unknown(path, map, CAP_FIELDS);

    if let Some(v) = c.required(path, map, "amount") {
        c.amount(&child(path, "amount"), v);
    }
    if let Some(v) = c.required(path, map, "currency") {
        c.currency(&child(path, "currency"), v);
    }
    if let Some(v) = c.required(path, map, "period") {
        c.enumeration(&child(path, "period"), v, PERIODS);
    }
}

fn check_merchant_list(c: &mut Collector, path: &str, value: &Value) {
    let Value::Array(items) = value else {
        c.push(path, format!("expected array, got {}", type_name(value)));
        return;
    };
    let mut seen = HashSet::new();
    for (i, item) in items.iter().enumerate() {
        let p = index(path, i);
        if let Some(merchant) = c.non_empty_string(&p, item) {
            if !seen.insert(merchant) {
                c.push(&p, format!("duplicate merchant identifier '{merchant}'"));
            }
        }
    }
}

/// Returns `Some(sum)` when every item is well-formed (`sum` itself is
/// `None` on overflow), `None` when any item failed.
fn check_line_items(c: &mut Collector, path: &str, value: &Value) -> Option<Option<u64>> {
    let Value::Array(items) = value else {
        c.push(path, format!("expected array, got {}", type_name(value)));
        return None;
    };

    let mut all_ok = true;
    let mut sum: Option<u64> = Some(0);
    for (i, item) in items.iter().enumerate() {
        let item_path = index(path, i);
        match check_line_item(c, &item_path, item) {
            Some(subtotal) => {
                sum = match (sum, subtotal) {
                    (Some(acc), Some(st)) => acc.checked_add(st),
                    _ => None,
                };
            }
            None => all_ok = false,
        }
    }
    all_ok.then_some(sum)
}

fn check_line_item(c: &mut Collector, path: &str, value: &Value) -> Option<Option<u64>> {
    let map = c.object(path, value)?;
    let before = c.issues.len();
    c.reject_unknown(path, map, LINE_ITEM_FIELDS);

    if let Some(v) = c.required(path, map, "sku") {
        c.non_empty_string(&child(path, "sku"), v);
    }
    let qty = c.required(path, map, "qty").and_then(|v| {
        let p = child(path, "qty");
        let qty = c.amount(&p, v)?;
        if qty == 0 {
            c.push(&p, "must be greater than 0");
            return None;
        }
        Some(qty)
    });
    let unit = c
        .required(path, map, "unit_amount")
        .and_then(|v| c.amount(&child(path, "unit_amount"), v));
    if let Some(v) = c.required(path, map, "currency") {
        c.currency(&child(path, "currency"), v);
    }

    if c.issues.len() != before {
        return None;
    }
    match (qty, unit) {
        (Some(q), Some(u)) => Some(q.checked_mul(u)),
        _ => None,
    }
}

/// Free-form metadata is signed too, so its numbers obey the same range.
fn check_meta_numbers(c: &mut Collector, path: &str, value: &Value) {
    match value {
        Value::Number(n) => {
            let safe = match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => i.unsigned_abs() <= MAX_SAFE_INTEGER,
                (None, Some(u)) => u <= MAX_SAFE_INTEGER,
                (None, None) => false,
            };
            if !safe {
                c.push(
                    path,
                    format!("numbers must be integers within ±{MAX_SAFE_INTEGER}"),
                );
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_meta_numbers(c, &index(path, i), item);
            }
        }
        Value::Object(map) => {
            for (key, inner) in map {
                check_meta_numbers(c, &child(path, key), inner);
            }
        }
        _ => {}
    }
}

fn check_mandate_id(id: &str) -> Result<(), String> {
    let len = id.chars().count();
    if len < MIN_MANDATE_ID_LEN {
        return Err(format!(
            "must be at least {MIN_MANDATE_ID_LEN} characters"
        ));
    }
    if len > MAX_MANDATE_ID_LEN {
        return Err(format!("must be at most {MAX_MANDATE_ID_LEN} characters"));
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | ':'))
    {
        return Err("may only contain ASCII letters, digits, '-', '_', '.' and ':'".to_string());
    }
    Ok(())
}

fn check_url(s: &str) -> Result<(), String> {
    let parsed = url::Url::parse(s).map_err(|e| format!("invalid URL: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported URL scheme '{other}'")),
    }
}

fn is_currency_code(s: &str) -> bool {
    (3..=10).contains(&s.len()) && s.chars().all(|ch| ch.is_ascii_alphanumeric())
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn index(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

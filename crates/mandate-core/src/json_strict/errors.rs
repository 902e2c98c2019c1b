//! Errors and resource limits for strict JSON ingest.

use thiserror::Error;

/// Deepest allowed nesting of objects and arrays.
pub const MAX_NESTING_DEPTH: usize = 64;
/// Most members allowed in a single object.
pub const MAX_KEYS_PER_OBJECT: usize = 10_000;
/// Longest allowed string, counted in decoded characters.
pub const MAX_STRING_LENGTH: usize = 1_048_576;

/// Why a document was refused at ingest.
#[derive(Debug, Error)]
pub enum StrictJsonError {
    #[error("duplicate key '{key}' at '{path}'")]
    DuplicateKey { key: String, path: String },

    #[error("invalid unicode escape at byte {position}")]
    InvalidUnicodeEscape { position: usize },

    #[error("lone surrogate at byte {position}: {detail}")]
    LoneSurrogate { position: usize, detail: String },

    #[error("malformed JSON at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("nesting depth {depth} exceeds maximum {MAX_NESTING_DEPTH}")]
    NestingTooDeep { depth: usize },

    #[error("{count} keys in one object exceeds maximum {MAX_KEYS_PER_OBJECT}")]
    TooManyKeys { count: usize },

    #[error("string length {length} exceeds maximum {MAX_STRING_LENGTH}")]
    StringTooLong { length: usize },
}

//! Mandate signing and verification.
//!
//! # Signing Process
//!
//! ```text
//! 1. canonical = canonical_json(payload)
//! 2. signature = ed25519_sign(secret_key, canonical)
//! 3. envelope  = { alg: "ed25519", pubkey: b64(public_key), signature: b64(signature), payload }
//! ```
//!
//! Verification recomputes the canonical bytes from the received payload;
//! the canonical form itself is never transmitted.

use crate::crypto::canonical;
use crate::mandate::types::{MandateBody, SignatureAlgorithm, SignedMandate};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use std::fmt;

/// Key loading and encoding errors.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid base64 key material: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid secret key length: expected 32 or 64 bytes, got {0}")]
    InvalidLength(usize),

    #[error("secret key does not match its embedded public key")]
    PublicKeyMismatch,

    #[error("invalid PKCS#8 key: {0}")]
    Pkcs8(String),
}

/// Sign a payload.
///
/// Returns the standard padded base64 encoding of the 64-byte signature over
/// the canonical payload bytes.
pub fn sign(payload: &MandateBody, key: &SigningKey) -> Result<String> {
    let bytes = canonical::to_vec(payload).context("failed to canonicalize payload")?;
    let signature = key.sign(&bytes);
    Ok(BASE64.encode(signature.to_bytes()))
}

/// Sign a payload and wrap it in an envelope.
pub fn sign_mandate(payload: MandateBody, key: &SigningKey) -> Result<SignedMandate> {
    let signature = sign(&payload, key)?;
    tracing::debug!(mandate_id = %payload.mandate_id, "signed mandate");
    Ok(SignedMandate {
        alg: SignatureAlgorithm::Ed25519,
        pubkey: public_key_from_secret(key),
        signature,
        payload,
    })
}

/// Verify a signature over a payload.
///
/// Total: bad base64, wrong lengths, an invalid curve point and a mismatch
/// all return `false`. Callers see no distinction between these.
pub fn verify(pubkey_b64: &str, signature_b64: &str, payload: &MandateBody) -> bool {
    match try_verify(pubkey_b64, signature_b64, payload) {
        Ok(()) => true,
        Err(fault) => {
            tracing::debug!(fault, "signature verification failed");
            false
        }
    }
}

fn try_verify(
    pubkey_b64: &str,
    signature_b64: &str,
    payload: &MandateBody,
) -> Result<(), &'static str> {
    let pk_bytes: [u8; 32] = BASE64
        .decode(pubkey_b64)
        .map_err(|_| "pubkey is not base64")?
        .try_into()
        .map_err(|_| "pubkey is not 32 bytes")?;
    let sig_bytes: [u8; 64] = BASE64
        .decode(signature_b64)
        .map_err(|_| "signature is not base64")?
        .try_into()
        .map_err(|_| "signature is not 64 bytes")?;

    let key = VerifyingKey::from_bytes(&pk_bytes).map_err(|_| "pubkey is not a curve point")?;
    let signature = Signature::from_bytes(&sig_bytes);
    let message = canonical::to_vec(payload).map_err(|_| "payload not serializable")?;

    key.verify_strict(&message, &signature)
        .map_err(|_| "signature mismatch")
}

/// Verify an envelope's signature against its own payload.
pub fn verify_mandate(mandate: &SignedMandate) -> bool {
    verify(&mandate.pubkey, &mandate.signature, &mandate.payload)
}

/// Base64 of the 32-byte verifying key.
pub fn public_key_from_secret(key: &SigningKey) -> String {
    BASE64.encode(key.verifying_key().to_bytes())
}

/// Content digest of a payload (`sha256:<hex>` of its canonical form).
pub fn payload_digest(payload: &MandateBody) -> Result<String> {
    canonical::digest(payload)
}

/// Decode a signing key from base64.
///
/// Accepts a 32-byte seed, or the 64-byte `seed || public_key` layout used
/// by NaCl-style tooling. In the latter case the embedded public key must
/// match the one derived from the seed.
pub fn signing_key_from_base64(encoded: &str) -> Result<SigningKey, KeyError> {
    let bytes = BASE64.decode(encoded.trim())?;
    match bytes.len() {
        32 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        64 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes[..32]);
            let key = SigningKey::from_bytes(&seed);
            if key.verifying_key().as_bytes() != &bytes[32..] {
                return Err(KeyError::PublicKeyMismatch);
            }
            Ok(key)
        }
        n => Err(KeyError::InvalidLength(n)),
    }
}

/// Parse a PKCS#8 PEM private key.
pub fn load_signing_key_pem(pem: &str) -> Result<SigningKey, KeyError> {
    use pkcs8::DecodePrivateKey;

    SigningKey::from_pkcs8_pem(pem).map_err(|e| KeyError::Pkcs8(e.to_string()))
}

/// Encode a signing key as PKCS#8 PEM (LF line endings).
pub fn signing_key_to_pem(key: &SigningKey) -> Result<String, KeyError> {
    use pkcs8::{EncodePrivateKey, LineEnding};

    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeyError::Pkcs8(e.to_string()))?;
    Ok(pem.as_str().to_owned())
}

/// A freshly generated agent keypair.
pub struct AgentIdentity {
    pub signing_key: SigningKey,
    /// Base64 of the verifying key
    pub pubkey: String,
}

impl AgentIdentity {
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::thread_rng()))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let pubkey = public_key_from_secret(&signing_key);
        Self {
            signing_key,
            pubkey,
        }
    }
}

impl fmt::Debug for AgentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentIdentity")
            .field("pubkey", &self.pubkey)
            .finish_non_exhaustive()
    }
}

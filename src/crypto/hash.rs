//! Canonical certificate hashing.
//!
//! The digest is computed over the certificate's stable field subset as
//! RFC 8785 (JCS) canonical JSON with a domain-separation prefix:
//!
//! ```text
//! certificate_digest = SHA256(b"CREDENTIS_CERT_V1" || JCS(hash_input))
//! ```
//!
//! Canonicalization makes the digest independent of serialization key order,
//! so recomputing over unchanged fields is byte-identical every time.

use sha2::{Digest, Sha256};

use crate::domain::{CertificateHashInput, Hash256};

/// Domain prefix for certificate digests
pub const DOMAIN_CERTIFICATE: &[u8] = b"CREDENTIS_CERT_V1";

/// Convert a JSON value to its RFC 8785 canonical string form.
///
/// # Panics
///
/// Panics if the value contains a float that cannot be represented
/// (NaN or Infinity); these are not valid JSON.
pub fn canonicalize_json(value: &serde_json::Value) -> String {
    serde_json_canonicalizer::to_string(value)
        .expect("Failed to canonicalize JSON - contains invalid values (NaN or Infinity)")
}

/// Hash raw bytes with SHA-256 (no domain prefix)
pub fn sha256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the canonical digest over a certificate's stable field subset.
pub fn certificate_digest(input: &CertificateHashInput<'_>) -> Hash256 {
    let value = serde_json::to_value(input)
        .expect("CertificateHashInput serializes to plain strings");
    let canonical = canonicalize_json(&value);

    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_CERTIFICATE);
    hasher.update(canonical.as_bytes());
    hasher.finalize().into()
}

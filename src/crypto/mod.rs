//! Cryptographic utilities: canonical certificate digests and Ed25519
//! signing.

pub mod hash;
pub mod signing;

pub use hash::{canonicalize_json, certificate_digest, sha256};
pub use signing::{CertificateSigner, CertificateVerifyingKey, SigningError};

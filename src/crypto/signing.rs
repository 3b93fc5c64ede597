//! Certificate signing with Ed25519.
//!
//! The engine never invents its own signature scheme; this is a thin wrapper
//! around `ed25519-dalek` that signs the canonical certificate digest. The
//! signer identity string attached to certificates is derived from the
//! public key.

use ed25519_dalek::{
    Signature, Signer, SigningKey, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
use rand::rngs::OsRng;

use crate::domain::Hash256;

/// Ed25519 signature (64 bytes)
pub type Signature64 = [u8; SIGNATURE_LENGTH];

/// Ed25519 public key (32 bytes)
pub type PublicKey32 = [u8; PUBLIC_KEY_LENGTH];

/// Ed25519 secret key (32 bytes)
pub type SecretKey32 = [u8; SECRET_KEY_LENGTH];

/// Error type for signing operations
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("invalid signature format")]
    InvalidSignatureFormat,

    #[error("invalid public key format")]
    InvalidPublicKeyFormat,

    #[error("invalid secret key format")]
    InvalidSecretKeyFormat,

    #[error("signature verification failed")]
    VerificationFailed,
}

/// University signing keypair
#[derive(Clone)]
pub struct CertificateSigner {
    signing_key: SigningKey,
}

impl CertificateSigner {
    /// Generate a new random signing key
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Create from secret key bytes
    pub fn from_bytes(bytes: &SecretKey32) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    /// Create from a hex-encoded secret key
    pub fn from_hex(hex_key: &str) -> Result<Self, SigningError> {
        let bytes: SecretKey32 = hex::decode(hex_key)
            .map_err(|_| SigningError::InvalidSecretKeyFormat)?
            .try_into()
            .map_err(|_| SigningError::InvalidSecretKeyFormat)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Get the secret key bytes
    pub fn to_bytes(&self) -> SecretKey32 {
        self.signing_key.to_bytes()
    }

    /// Get the public key bytes
    pub fn public_key_bytes(&self) -> PublicKey32 {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Signer identity string recorded on signed certificates
    pub fn identity(&self) -> String {
        format!("ed25519:{}", hex::encode(self.public_key_bytes()))
    }

    /// Sign a certificate digest
    pub fn sign(&self, digest: &Hash256) -> Signature64 {
        self.signing_key.sign(digest).to_bytes()
    }

    pub fn verifying_key(&self) -> CertificateVerifyingKey {
        CertificateVerifyingKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }
}

impl std::fmt::Debug for CertificateSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateSigner")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// Public key for verifying certificate signatures
#[derive(Clone)]
pub struct CertificateVerifyingKey {
    verifying_key: VerifyingKey,
}

impl CertificateVerifyingKey {
    /// Create from public key bytes
    pub fn from_bytes(bytes: &PublicKey32) -> Result<Self, SigningError> {
        let verifying_key =
            VerifyingKey::from_bytes(bytes).map_err(|_| SigningError::InvalidPublicKeyFormat)?;
        Ok(Self { verifying_key })
    }

    /// Verify a signature over a certificate digest
    pub fn verify(&self, digest: &Hash256, signature: &[u8]) -> Result<(), SigningError> {
        let signature: Signature64 = signature
            .try_into()
            .map_err(|_| SigningError::InvalidSignatureFormat)?;
        let signature = Signature::from_bytes(&signature);
        self.verifying_key
            .verify(digest, &signature)
            .map_err(|_| SigningError::VerificationFailed)
    }
}

impl std::fmt::Debug for CertificateVerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateVerifyingKey")
            .field("public_key", &hex::encode(self.verifying_key.to_bytes()))
            .finish()
    }
}

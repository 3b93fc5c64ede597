//! Certificate entity and its lifecycle state machine.
//!
//! ```text
//! Draft -> Hashed -> Signed -> Anchored
//!   \________\_________\_________\____-> Revoked
//! ```
//!
//! All transitions go through the methods on [`Certificate`]; nothing else
//! mutates lifecycle state. `Revoked` is terminal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::{hash256_hex, CertificateId, FacultyId, Hash256, StudentId, UniversityId};
use crate::infra::{EngineError, Result};

/// Lifecycle state of a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateStatus {
    Draft,
    Hashed,
    Signed,
    Anchored,
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Draft => "draft",
            CertificateStatus::Hashed => "hashed",
            CertificateStatus::Signed => "signed",
            CertificateStatus::Anchored => "anchored",
            CertificateStatus::Revoked => "revoked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(CertificateStatus::Draft),
            "hashed" => Some(CertificateStatus::Hashed),
            "signed" => Some(CertificateStatus::Signed),
            "anchored" => Some(CertificateStatus::Anchored),
            "revoked" => Some(CertificateStatus::Revoked),
            _ => None,
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Credential type.
///
/// Degree kinds are single-instance: a student may hold at most one
/// non-revoked certificate of that kind per university.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateKind {
    Bachelor,
    Master,
    Doctorate,
    Diploma,
    Award,
}

impl CertificateKind {
    pub fn is_single_instance(&self) -> bool {
        matches!(
            self,
            CertificateKind::Bachelor | CertificateKind::Master | CertificateKind::Doctorate
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateKind::Bachelor => "bachelor",
            CertificateKind::Master => "master",
            CertificateKind::Doctorate => "doctorate",
            CertificateKind::Diploma => "diploma",
            CertificateKind::Award => "award",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bachelor" => Some(CertificateKind::Bachelor),
            "master" => Some(CertificateKind::Master),
            "doctorate" => Some(CertificateKind::Doctorate),
            "diploma" => Some(CertificateKind::Diploma),
            "award" => Some(CertificateKind::Award),
            _ => None,
        }
    }
}

impl fmt::Display for CertificateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ledger metadata recorded when a certificate is anchored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAnchor {
    /// Transaction identifier returned by the ledger
    pub tx_id: String,

    /// Digest as recorded on the ledger
    #[serde(with = "hash256_hex")]
    pub digest: Hash256,

    /// Ledger-side timestamp
    pub anchored_at: DateTime<Utc>,
}

/// Inputs for creating a certificate in `Draft`
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub student_id: StudentId,
    pub faculty_id: FacultyId,
    pub university_id: UniversityId,
    pub student_code: String,
    pub kind: CertificateKind,
    pub name: String,
    pub serial_number: String,
    pub registration_number: String,
    pub issue_date: NaiveDate,
}

/// The stable, explicitly enumerated field subset the digest is computed
/// over: identity and descriptive fields only. Status, signature and ledger
/// metadata are volatile and excluded by construction.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateHashInput<'a> {
    pub certificate_id: String,
    pub student_id: String,
    pub faculty_id: String,
    pub university_id: String,
    pub student_code: &'a str,
    pub kind: &'a str,
    pub name: &'a str,
    pub serial_number: &'a str,
    pub registration_number: &'a str,
    pub issue_date: String,
}

/// An issued (or in-flight) credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub student_id: StudentId,
    pub faculty_id: FacultyId,
    pub university_id: UniversityId,
    pub student_code: String,

    pub kind: CertificateKind,
    pub name: String,
    pub serial_number: String,
    pub registration_number: String,
    pub issue_date: NaiveDate,

    pub status: CertificateStatus,
    #[serde(with = "super::types::option_hash256_hex")]
    pub hash: Option<Hash256>,
    pub signature: Option<Vec<u8>>,
    pub signer_identity: Option<String>,
    pub anchor: Option<LedgerAnchor>,
    pub file_path: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    pub fn new(input: NewCertificate) -> Self {
        let now = Utc::now();
        Self {
            id: CertificateId::new(),
            student_id: input.student_id,
            faculty_id: input.faculty_id,
            university_id: input.university_id,
            student_code: input.student_code,
            kind: input.kind,
            name: input.name,
            serial_number: input.serial_number,
            registration_number: input.registration_number,
            issue_date: input.issue_date,
            status: CertificateStatus::Draft,
            hash: None,
            signature: None,
            signer_identity: None,
            anchor: None,
            file_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition_error(&self, operation: &'static str) -> EngineError {
        EngineError::State {
            certificate_id: self.id.to_string(),
            from: self.status.as_str(),
            operation,
        }
    }

    /// The field subset the canonical digest is computed over.
    pub fn hash_input(&self) -> CertificateHashInput<'_> {
        CertificateHashInput {
            certificate_id: self.id.to_string(),
            student_id: self.student_id.to_string(),
            faculty_id: self.faculty_id.to_string(),
            university_id: self.university_id.to_string(),
            student_code: &self.student_code,
            kind: self.kind.as_str(),
            name: &self.name,
            serial_number: &self.serial_number,
            registration_number: &self.registration_number,
            issue_date: self.issue_date.format("%Y-%m-%d").to_string(),
        }
    }

    /// Record the canonical digest.
    ///
    /// Allowed from `Draft` and (idempotently) from `Hashed`; recomputing on
    /// unchanged inputs yields the same bytes. Disallowed once signed:
    /// changing the digest would invalidate the signature, so the only way
    /// forward is revoke and re-create.
    pub fn record_hash(&mut self, digest: Hash256) -> Result<()> {
        match self.status {
            CertificateStatus::Draft | CertificateStatus::Hashed => {
                self.hash = Some(digest);
                self.status = CertificateStatus::Hashed;
                self.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(self.transition_error("hash")),
        }
    }

    /// Attach a signature and signer identity. Valid only from `Hashed`.
    pub fn attach_signature(
        &mut self,
        signature: Vec<u8>,
        signer_identity: impl Into<String>,
    ) -> Result<()> {
        if self.status != CertificateStatus::Hashed {
            return Err(self.transition_error("sign"));
        }
        self.signature = Some(signature);
        self.signer_identity = Some(signer_identity.into());
        self.status = CertificateStatus::Signed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Check that anchoring is legal from the current state, without
    /// mutating. The orchestrator calls this before the ledger round trip so
    /// a misplaced anchor attempt never reaches the collaborator.
    pub fn ensure_can_anchor(&self) -> Result<()> {
        if self.status != CertificateStatus::Signed {
            return Err(self.transition_error("anchor"));
        }
        Ok(())
    }

    /// Record a successful ledger anchor. Valid only from `Signed`.
    pub fn record_anchor(&mut self, anchor: LedgerAnchor) -> Result<()> {
        if self.status != CertificateStatus::Signed {
            return Err(self.transition_error("anchor"));
        }
        self.anchor = Some(anchor);
        self.status = CertificateStatus::Anchored;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Revoke from any state. Irreversible; the record is kept.
    pub fn revoke(&mut self) -> Result<()> {
        if self.status == CertificateStatus::Revoked {
            return Err(self.transition_error("revoke"));
        }
        self.status = CertificateStatus::Revoked;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the blob-store object key of the certificate file.
    /// Not a lifecycle transition; allowed in any live state.
    pub fn attach_file(&mut self, object_key: impl Into<String>) -> Result<()> {
        if self.status == CertificateStatus::Revoked {
            return Err(self.transition_error("attach file"));
        }
        self.file_path = Some(object_key.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn is_revoked(&self) -> bool {
        self.status == CertificateStatus::Revoked
    }
}

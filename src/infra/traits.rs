//! Collaborator interfaces for the record and credential engine.
//!
//! The engine talks to storage, the ledger, the blob store and the notifier
//! exclusively through these narrow traits. Repository lookups return
//! `Option`; inserts surface uniqueness races as distinguishable conflict
//! errors (atomic check-and-insert), never raw storage errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    Capability, Certificate, CertificateId, CertificateKind, CertificateStatus, Faculty,
    FacultyId, Hash256, ScoreId, ScoreRecord, Student, StudentId, Subject, SubjectId,
    University, UniversityId, VerificationCode, VerificationCodeId,
};

use super::Result;

/// Score record storage.
///
/// Invariant: at most one record per (student, subject, semester); `insert`
/// relies on the storage layer's atomic uniqueness guarantee and reports a
/// duplicate triple as `DuplicateScore`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    async fn insert(&self, record: &ScoreRecord) -> Result<()>;

    async fn update(&self, record: &ScoreRecord) -> Result<()>;

    async fn find_by_id(&self, id: ScoreId) -> Result<Option<ScoreRecord>>;

    async fn list_by_student(&self, student_id: StudentId) -> Result<Vec<ScoreRecord>>;

    async fn list_by_subject(&self, subject_id: SubjectId) -> Result<Vec<ScoreRecord>>;
}

/// Subject reference data lookups
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SubjectCatalog: Send + Sync {
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Subject>>;
}

/// Student directory lookups
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn find_by_id(&self, id: StudentId) -> Result<Option<Student>>;

    /// Scoped lookup: only students belonging to `university_id` are visible
    async fn find_by_code(
        &self,
        university_id: UniversityId,
        student_code: &str,
    ) -> Result<Option<Student>>;
}

/// Faculty and university reference data lookups
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InstitutionDirectory: Send + Sync {
    async fn find_faculty(&self, id: FacultyId) -> Result<Option<Faculty>>;

    async fn find_university(&self, id: UniversityId) -> Result<Option<University>>;
}

/// Search filter for certificate listings, scoped to one university
#[derive(Debug, Clone, Default)]
pub struct CertificateFilter {
    pub student_code: Option<String>,
    pub kind: Option<CertificateKind>,
    pub status: Option<CertificateStatus>,
    pub faculty_id: Option<FacultyId>,
    pub page: u32,
    pub page_size: u32,
}

/// Certificate storage.
///
/// `insert` is the atomic check-and-insert of the creation invariants: a
/// duplicate serial number, registration number or single-instance degree
/// kind comes back as the matching conflict variant, arbitrated by the
/// storage layer's transactional semantics rather than an in-process check.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    async fn insert(&self, certificate: &Certificate) -> Result<()>;

    async fn update(&self, certificate: &Certificate) -> Result<()>;

    async fn find_by_id(&self, id: CertificateId) -> Result<Option<Certificate>>;

    async fn find_by_serial(
        &self,
        university_id: UniversityId,
        serial_number: &str,
    ) -> Result<Option<Certificate>>;

    async fn list_by_student(&self, student_id: StudentId) -> Result<Vec<Certificate>>;

    /// Filtered page plus the total match count
    async fn search(
        &self,
        university_id: UniversityId,
        filter: &CertificateFilter,
    ) -> Result<(Vec<Certificate>, u64)>;
}

/// Verification code storage
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VerificationCodeRepository: Send + Sync {
    async fn insert(&self, code: &VerificationCode) -> Result<()>;

    async fn find_by_code(&self, code: &str) -> Result<Option<VerificationCode>>;

    async fn list_by_owner(&self, owner_id: StudentId) -> Result<Vec<VerificationCode>>;

    /// Persist a viewed flag set during redemption
    async fn mark_viewed(&self, id: VerificationCodeId, capability: Capability) -> Result<()>;
}

/// Receipt returned by the ledger after a successful anchor submission
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerReceipt {
    pub tx_id: String,
    pub digest: Hash256,
    pub timestamp: DateTime<Utc>,
}

/// Distributed ledger collaborator.
///
/// The engine knows nothing about transport, endorsement or peer topology;
/// it submits a digest and gets a receipt. Submissions are at-least-once:
/// the ledger side deduplicates by certificate identity.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerService: Send + Sync {
    async fn submit(&self, certificate_id: CertificateId, digest: Hash256)
        -> Result<LedgerReceipt>;

    /// Read back the anchored digest, if any
    async fn query(&self, certificate_id: CertificateId) -> Result<Option<Hash256>>;
}

/// Object storage collaborator for certificate files
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, object_key: &str, bytes: &[u8], content_type: &str) -> Result<()>;

    async fn get(&self, object_key: &str) -> Result<Vec<u8>>;
}

/// Fire-and-forget message delivery; retries are the collaborator's concern
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, destination: &str, message: &str) -> Result<()>;
}

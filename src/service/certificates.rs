//! Certificate lifecycle orchestration.
//!
//! Composes the certificate entity's state machine with the repository,
//! ledger, blob store and signing key. Anchoring is the only operation with
//! a non-trivial external round trip; it honors a deadline and leaves the
//! certificate untouched unless the ledger call definitively succeeds.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::crypto::{certificate_digest, CertificateSigner};
use crate::domain::{
    Certificate, CertificateId, CertificateKind, LedgerAnchor, NewCertificate, StudentId,
    UniversityId,
};
use crate::infra::{
    BlobStore, CertificateFilter, CertificateRepository, EngineError, InstitutionDirectory,
    LedgerService, Result, StudentDirectory,
};

/// Request to create a certificate in `Draft`
#[derive(Debug, Clone)]
pub struct NewCertificateRequest {
    pub student_code: String,
    pub kind: CertificateKind,
    pub name: String,
    pub serial_number: String,
    pub registration_number: String,
    pub issue_date: NaiveDate,
}

/// Result of comparing the stored hash against the ledger
#[derive(Debug, Clone, Serialize)]
pub struct LedgerVerification {
    /// Whether the ledger holds a digest for this certificate
    pub anchored: bool,
    /// Whether that digest matches the locally stored hash
    pub digest_matches: Option<bool>,
}

/// Orchestrates the certificate lifecycle end to end
pub struct CertificateService {
    certificates: Arc<dyn CertificateRepository>,
    students: Arc<dyn StudentDirectory>,
    institutions: Arc<dyn InstitutionDirectory>,
    ledger: Option<Arc<dyn LedgerService>>,
    blobs: Arc<dyn BlobStore>,
    signer: Arc<CertificateSigner>,
    anchor_timeout: Duration,
}

impl CertificateService {
    pub fn new(
        certificates: Arc<dyn CertificateRepository>,
        students: Arc<dyn StudentDirectory>,
        institutions: Arc<dyn InstitutionDirectory>,
        ledger: Option<Arc<dyn LedgerService>>,
        blobs: Arc<dyn BlobStore>,
        signer: Arc<CertificateSigner>,
        anchor_timeout: Duration,
    ) -> Self {
        Self {
            certificates,
            students,
            institutions,
            ledger,
            blobs,
            signer,
            anchor_timeout,
        }
    }

    /// Create a certificate for a student of the issuing university.
    ///
    /// The uniqueness invariants (serial number, registration number,
    /// single-instance degree kind) are enforced by the repository's atomic
    /// insert; two racing creations cannot both succeed.
    pub async fn create(
        &self,
        university_id: UniversityId,
        request: NewCertificateRequest,
    ) -> Result<Certificate> {
        let student = self
            .students
            .find_by_code(university_id, &request.student_code)
            .await?
            .ok_or_else(|| EngineError::not_found("student", &request.student_code))?;

        let faculty_id = student.faculty_id.ok_or(EngineError::Validation {
            field: "student_code",
            message: "student has not been assigned to a faculty".to_string(),
        })?;

        self.institutions
            .find_faculty(faculty_id)
            .await?
            .ok_or_else(|| EngineError::not_found("faculty", faculty_id))?;
        self.institutions
            .find_university(university_id)
            .await?
            .ok_or_else(|| EngineError::not_found("university", university_id))?;

        let certificate = Certificate::new(NewCertificate {
            student_id: student.id,
            faculty_id,
            university_id,
            student_code: student.student_code,
            kind: request.kind,
            name: request.name,
            serial_number: request.serial_number,
            registration_number: request.registration_number,
            issue_date: request.issue_date,
        });

        self.certificates.insert(&certificate).await?;
        info!(certificate_id = %certificate.id, kind = %certificate.kind, "certificate created");
        Ok(certificate)
    }

    async fn load(&self, id: CertificateId) -> Result<Certificate> {
        self.certificates
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("certificate", id))
    }

    /// Compute and record the canonical digest. Idempotent: unchanged input
    /// fields produce byte-identical output on every call.
    pub async fn hash(&self, id: CertificateId) -> Result<Certificate> {
        let mut certificate = self.load(id).await?;
        let digest = certificate_digest(&certificate.hash_input());
        certificate.record_hash(digest)?;
        self.certificates.update(&certificate).await?;
        Ok(certificate)
    }

    /// Sign the stored digest with the university signing key
    pub async fn sign(&self, id: CertificateId) -> Result<Certificate> {
        let mut certificate = self.load(id).await?;

        let digest = certificate.hash.ok_or(EngineError::State {
            certificate_id: id.to_string(),
            from: certificate.status.as_str(),
            operation: "sign",
        })?;

        let signature = self.signer.sign(&digest);
        certificate.attach_signature(signature.to_vec(), self.signer.identity())?;
        self.certificates.update(&certificate).await?;

        info!(certificate_id = %id, signer = %self.signer.identity(), "certificate signed");
        Ok(certificate)
    }

    /// Submit the digest to the ledger and record the receipt.
    ///
    /// At-least-once: the ledger deduplicates by certificate identity, so a
    /// timed-out attempt is safely retriable. On timeout or failure the
    /// certificate stays `Signed` and nothing is persisted; on success the
    /// status flip and ledger metadata land in a single update, so readers
    /// never observe a partially anchored certificate.
    pub async fn anchor(&self, id: CertificateId) -> Result<Certificate> {
        let mut certificate = self.load(id).await?;
        certificate.ensure_can_anchor()?;

        let ledger = self.ledger.as_ref().ok_or_else(|| {
            EngineError::external("anchor", false, "ledger service not configured")
        })?;

        let digest = certificate.hash.ok_or(EngineError::State {
            certificate_id: id.to_string(),
            from: certificate.status.as_str(),
            operation: "anchor",
        })?;

        let receipt = tokio::time::timeout(self.anchor_timeout, ledger.submit(id, digest))
            .await
            .map_err(|_| {
                warn!(certificate_id = %id, "ledger submission timed out; certificate stays signed");
                EngineError::external("anchor", true, "ledger submission timed out")
            })??;

        certificate.record_anchor(LedgerAnchor {
            tx_id: receipt.tx_id,
            digest: receipt.digest,
            anchored_at: receipt.timestamp,
        })?;
        self.certificates.update(&certificate).await?;

        info!(certificate_id = %id, "certificate anchored");
        Ok(certificate)
    }

    /// Revoke from any live state. Irreversible.
    pub async fn revoke(&self, id: CertificateId) -> Result<Certificate> {
        let mut certificate = self.load(id).await?;
        certificate.revoke()?;
        self.certificates.update(&certificate).await?;
        info!(certificate_id = %id, "certificate revoked");
        Ok(certificate)
    }

    pub async fn get(&self, id: CertificateId) -> Result<Certificate> {
        self.load(id).await
    }

    pub async fn list_by_student(&self, student_id: StudentId) -> Result<Vec<Certificate>> {
        self.certificates.list_by_student(student_id).await
    }

    pub async fn search(
        &self,
        university_id: UniversityId,
        filter: &CertificateFilter,
    ) -> Result<(Vec<Certificate>, u64)> {
        self.certificates.search(university_id, filter).await
    }

    /// Store the certificate file and record its object key.
    ///
    /// The key convention is `certificates/{universityCode}/{filename}`; the
    /// blob store owns everything below that. Uploads carry no dedup key, so
    /// a failed upload is not blindly retriable.
    pub async fn upload_file(
        &self,
        id: CertificateId,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String> {
        if filename.is_empty() || filename.contains('/') || filename.contains("..") {
            return Err(EngineError::Validation {
                field: "filename",
                message: format!("invalid filename {filename:?}"),
            });
        }

        let mut certificate = self.load(id).await?;
        let university = self
            .institutions
            .find_university(certificate.university_id)
            .await?
            .ok_or_else(|| EngineError::not_found("university", certificate.university_id))?;

        let object_key = format!("certificates/{}/{}", university.code, filename);
        let content_type = detect_content_type(bytes);

        self.blobs.put(&object_key, bytes, content_type).await?;

        certificate.attach_file(object_key.clone())?;
        self.certificates.update(&certificate).await?;
        Ok(object_key)
    }

    /// Fetch the certificate file bytes from the blob store
    pub async fn fetch_file(&self, id: CertificateId) -> Result<Vec<u8>> {
        let certificate = self.load(id).await?;
        let object_key = certificate
            .file_path
            .as_deref()
            .ok_or_else(|| EngineError::not_found("certificate file", id))?;
        self.blobs.get(object_key).await
    }

    /// Read the anchored digest back from the ledger and compare it with the
    /// locally stored hash.
    pub async fn verify_against_ledger(&self, id: CertificateId) -> Result<LedgerVerification> {
        let certificate = self.load(id).await?;
        let ledger = self.ledger.as_ref().ok_or_else(|| {
            EngineError::external("ledger verify", false, "ledger service not configured")
        })?;

        let ledger_digest = ledger.query(id).await?;
        Ok(match ledger_digest {
            Some(digest) => LedgerVerification {
                anchored: true,
                digest_matches: certificate.hash.map(|local| local == digest),
            },
            None => LedgerVerification {
                anchored: false,
                digest_matches: None,
            },
        })
    }
}

/// Sniff the content type from the payload's magic bytes
fn detect_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"%PDF") {
        "application/pdf"
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CertificateStatus, FacultyId, Faculty, Student, University};
    use crate::infra::{
        LedgerReceipt, MockBlobStore, MockCertificateRepository, MockInstitutionDirectory,
        MockLedgerService, MockStudentDirectory,
    };
    use chrono::Utc;

    fn request() -> NewCertificateRequest {
        NewCertificateRequest {
            student_code: "SV001".into(),
            kind: CertificateKind::Bachelor,
            name: "Bachelor of Computer Science".into(),
            serial_number: "SN-0001".into(),
            registration_number: "REG-0001".into(),
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        }
    }

    fn student_with_faculty(university_id: UniversityId) -> Student {
        Student {
            id: StudentId::new(),
            student_code: "SV001".into(),
            full_name: "Alex Doe".into(),
            faculty_id: Some(FacultyId::new()),
            university_id,
        }
    }

    fn directories(university_id: UniversityId) -> MockInstitutionDirectory {
        let mut institutions = MockInstitutionDirectory::new();
        institutions.expect_find_faculty().returning(|id| {
            Ok(Some(Faculty {
                id,
                code: "IT".into(),
                name: "Information Technology".into(),
                university_id: UniversityId::new(),
            }))
        });
        institutions.expect_find_university().returning(move |id| {
            assert_eq!(id, university_id);
            Ok(Some(University {
                id,
                code: "UNI1".into(),
                name: "First University".into(),
            }))
        });
        institutions
    }

    struct Fixture {
        certificates: MockCertificateRepository,
        students: MockStudentDirectory,
        institutions: MockInstitutionDirectory,
        ledger: Option<Arc<dyn LedgerService>>,
        blobs: MockBlobStore,
    }

    impl Fixture {
        fn new(university_id: UniversityId) -> Self {
            let mut students = MockStudentDirectory::new();
            students
                .expect_find_by_code()
                .returning(move |_, _| Ok(Some(student_with_faculty(university_id))));
            Self {
                certificates: MockCertificateRepository::new(),
                students,
                institutions: directories(university_id),
                ledger: None,
                blobs: MockBlobStore::new(),
            }
        }

        fn build(self) -> CertificateService {
            CertificateService::new(
                Arc::new(self.certificates),
                Arc::new(self.students),
                Arc::new(self.institutions),
                self.ledger,
                Arc::new(self.blobs),
                Arc::new(CertificateSigner::generate()),
                Duration::from_millis(200),
            )
        }
    }

    fn signed_certificate() -> Certificate {
        let mut certificate = Certificate::new(NewCertificate {
            student_id: StudentId::new(),
            faculty_id: FacultyId::new(),
            university_id: UniversityId::new(),
            student_code: "SV001".into(),
            kind: CertificateKind::Bachelor,
            name: "Bachelor of Computer Science".into(),
            serial_number: "SN-0001".into(),
            registration_number: "REG-0001".into(),
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        });
        let digest = certificate_digest(&certificate.hash_input());
        certificate.record_hash(digest).unwrap();
        certificate
            .attach_signature(vec![7u8; 64], "ed25519:test")
            .unwrap();
        certificate
    }

    #[tokio::test]
    async fn create_enters_draft_state() {
        let university_id = UniversityId::new();
        let mut fixture = Fixture::new(university_id);
        fixture
            .certificates
            .expect_insert()
            .withf(|c| c.status == CertificateStatus::Draft && c.hash.is_none())
            .returning(|_| Ok(()));

        let certificate = fixture.build().create(university_id, request()).await.unwrap();
        assert_eq!(certificate.status, CertificateStatus::Draft);
        assert_eq!(certificate.university_id, university_id);
    }

    #[tokio::test]
    async fn create_requires_faculty_assignment() {
        let university_id = UniversityId::new();
        let mut fixture = Fixture::new(university_id);
        fixture.students = MockStudentDirectory::new();
        fixture.students.expect_find_by_code().returning(move |_, _| {
            Ok(Some(Student {
                faculty_id: None,
                ..student_with_faculty(university_id)
            }))
        });

        let err = fixture
            .build()
            .create(university_id, request())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "student_code", .. }));
    }

    #[tokio::test]
    async fn hash_twice_yields_identical_digest() {
        let university_id = UniversityId::new();
        let mut certificate = Certificate::new(NewCertificate {
            student_id: StudentId::new(),
            faculty_id: FacultyId::new(),
            university_id,
            student_code: "SV001".into(),
            kind: CertificateKind::Bachelor,
            name: "Bachelor of Computer Science".into(),
            serial_number: "SN-0001".into(),
            registration_number: "REG-0001".into(),
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        });

        let mut fixture = Fixture::new(university_id);
        let stored = std::sync::Arc::new(std::sync::Mutex::new(certificate.clone()));
        let reader = stored.clone();
        fixture
            .certificates
            .expect_find_by_id()
            .returning(move |_| Ok(Some(reader.lock().unwrap().clone())));
        let writer = stored.clone();
        fixture.certificates.expect_update().returning(move |c| {
            *writer.lock().unwrap() = c.clone();
            Ok(())
        });

        let service = fixture.build();
        let first = service.hash(certificate.id).await.unwrap();
        let second = service.hash(certificate.id).await.unwrap();

        assert_eq!(first.hash, second.hash);
        assert_eq!(second.status, CertificateStatus::Hashed);

        // matches a direct recomputation over the unchanged fields
        let expected = certificate_digest(&certificate.hash_input());
        certificate.record_hash(expected).unwrap();
        assert_eq!(first.hash, Some(expected));
    }

    #[tokio::test]
    async fn sign_before_hash_is_rejected() {
        let university_id = UniversityId::new();
        let draft = Certificate::new(NewCertificate {
            student_id: StudentId::new(),
            faculty_id: FacultyId::new(),
            university_id,
            student_code: "SV001".into(),
            kind: CertificateKind::Bachelor,
            name: "x".into(),
            serial_number: "SN-1".into(),
            registration_number: "REG-1".into(),
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        });

        let mut fixture = Fixture::new(university_id);
        let seed = draft.clone();
        fixture
            .certificates
            .expect_find_by_id()
            .returning(move |_| Ok(Some(seed.clone())));

        let err = fixture.build().sign(draft.id).await.unwrap_err();
        assert!(matches!(err, EngineError::State { operation: "sign", .. }));
    }

    #[tokio::test]
    async fn anchor_success_records_receipt_atomically() {
        let certificate = signed_certificate();
        let digest = certificate.hash.unwrap();

        let mut fixture = Fixture::new(certificate.university_id);
        let seed = certificate.clone();
        fixture
            .certificates
            .expect_find_by_id()
            .returning(move |_| Ok(Some(seed.clone())));
        fixture
            .certificates
            .expect_update()
            .withf(|c| {
                c.status == CertificateStatus::Anchored
                    && c.anchor.as_ref().is_some_and(|a| a.tx_id == "tx-1")
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut ledger = MockLedgerService::new();
        ledger.expect_submit().returning(move |_, submitted| {
            assert_eq!(submitted, digest);
            Ok(LedgerReceipt {
                tx_id: "tx-1".into(),
                digest: submitted,
                timestamp: Utc::now(),
            })
        });
        fixture.ledger = Some(Arc::new(ledger));

        let anchored = fixture.build().anchor(certificate.id).await.unwrap();
        assert!(anchored.is_anchored());
    }

    #[tokio::test]
    async fn anchor_timeout_leaves_certificate_signed() {
        let certificate = signed_certificate();

        let mut fixture = Fixture::new(certificate.university_id);
        let seed = certificate.clone();
        fixture
            .certificates
            .expect_find_by_id()
            .returning(move |_| Ok(Some(seed.clone())));
        // no update expectation: nothing may be persisted on timeout

        struct SlowLedger;

        #[async_trait::async_trait]
        impl LedgerService for SlowLedger {
            async fn submit(
                &self,
                _certificate_id: CertificateId,
                digest: crate::domain::Hash256,
            ) -> crate::infra::Result<LedgerReceipt> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(LedgerReceipt {
                    tx_id: "late".into(),
                    digest,
                    timestamp: Utc::now(),
                })
            }

            async fn query(
                &self,
                _certificate_id: CertificateId,
            ) -> crate::infra::Result<Option<crate::domain::Hash256>> {
                Ok(None)
            }
        }

        fixture.ledger = Some(Arc::new(SlowLedger));

        let err = fixture.build().anchor(certificate.id).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn anchor_from_hashed_is_a_state_error() {
        let mut certificate = signed_certificate();
        certificate.signature = None;
        certificate.signer_identity = None;
        certificate.status = CertificateStatus::Hashed;

        let mut fixture = Fixture::new(certificate.university_id);
        let seed = certificate.clone();
        fixture
            .certificates
            .expect_find_by_id()
            .returning(move |_| Ok(Some(seed.clone())));

        let err = fixture.build().anchor(certificate.id).await.unwrap_err();
        assert!(matches!(err, EngineError::State { operation: "anchor", .. }));
    }

    #[tokio::test]
    async fn upload_file_uses_university_scoped_key() {
        let certificate = signed_certificate();

        let mut fixture = Fixture::new(certificate.university_id);
        let seed = certificate.clone();
        fixture
            .certificates
            .expect_find_by_id()
            .returning(move |_| Ok(Some(seed.clone())));
        fixture
            .certificates
            .expect_update()
            .withf(|c| c.file_path.as_deref() == Some("certificates/UNI1/degree.pdf"))
            .returning(|_| Ok(()));
        fixture
            .blobs
            .expect_put()
            .withf(|key, bytes, content_type| {
                key == "certificates/UNI1/degree.pdf"
                    && bytes.starts_with(b"%PDF")
                    && content_type == "application/pdf"
            })
            .returning(|_, _, _| Ok(()));

        let key = fixture
            .build()
            .upload_file(certificate.id, "degree.pdf", b"%PDF-1.7 ...")
            .await
            .unwrap();
        assert_eq!(key, "certificates/UNI1/degree.pdf");
    }

    #[tokio::test]
    async fn ledger_verification_compares_digests() {
        let certificate = signed_certificate();
        let digest = certificate.hash.unwrap();

        let mut fixture = Fixture::new(certificate.university_id);
        let seed = certificate.clone();
        fixture
            .certificates
            .expect_find_by_id()
            .returning(move |_| Ok(Some(seed.clone())));

        let mut ledger = MockLedgerService::new();
        ledger.expect_query().returning(move |_| Ok(Some(digest)));
        fixture.ledger = Some(Arc::new(ledger));

        let verification = fixture
            .build()
            .verify_against_ledger(certificate.id)
            .await
            .unwrap();
        assert!(verification.anchored);
        assert_eq!(verification.digest_matches, Some(true));
    }

    #[test]
    fn content_type_sniffing() {
        assert_eq!(detect_content_type(b"%PDF-1.7"), "application/pdf");
        assert_eq!(detect_content_type(&[0x89, b'P', b'N', b'G', 13]), "image/png");
        assert_eq!(detect_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(detect_content_type(b"hello"), "application/octet-stream");
    }
}

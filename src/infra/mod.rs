//! Collaborator interfaces and implementations.

mod error;
mod fs_blob;
mod notify;
pub mod postgres;
mod traits;
pub mod validation;

pub use error::{EngineError, ErrorKind, Result};
pub use fs_blob::FsBlobStore;
pub use notify::{NotifierConfig, WebhookNotifier};
pub use postgres::{
    PgCertificateRepository, PgInstitutionDirectory, PgScoreRepository, PgStudentDirectory,
    PgSubjectCatalog, PgVerificationCodeRepository,
};
pub use traits::{
    BlobStore, CertificateFilter, CertificateRepository, InstitutionDirectory, LedgerReceipt,
    LedgerService, Notifier, ScoreRepository, StudentDirectory, SubjectCatalog,
    VerificationCodeRepository,
};

#[cfg(test)]
pub use traits::{
    MockBlobStore, MockCertificateRepository, MockInstitutionDirectory, MockLedgerService,
    MockNotifier, MockScoreRepository, MockStudentDirectory, MockSubjectCatalog,
    MockVerificationCodeRepository,
};

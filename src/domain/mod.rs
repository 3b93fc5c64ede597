//! Core domain types for the academic record and credential engine.

mod certificate;
mod grade;
mod reference;
mod score;
mod types;
mod verification;

pub use certificate::{
    Certificate, CertificateHashInput, CertificateKind, CertificateStatus, LedgerAnchor,
    NewCertificate,
};
pub use grade::{grade, round1, CgpaSummary, GradeOutcome, LetterGrade};
pub use reference::{Faculty, Student, Subject, University};
pub use score::{ScoreInput, ScorePatch, ScoreRecord};
pub use types::{
    hash256_hex, option_hash256_hex, CertificateId, FacultyId, Hash256, ScoreId, StudentId,
    SubjectId, UniversityId, VerificationCodeId,
};
pub use verification::{Capability, VerificationCode};

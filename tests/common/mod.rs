//! Common test fixtures.

#![allow(dead_code)]

use chrono::NaiveDate;
use credentis::domain::{
    Certificate, CertificateKind, FacultyId, NewCertificate, StudentId, UniversityId,
};
use uuid::Uuid;

/// Fixed university ID for deterministic fixtures
pub fn test_university_id() -> UniversityId {
    UniversityId::from_uuid(Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap())
}

/// Fixed student ID for deterministic fixtures
pub fn test_student_id() -> StudentId {
    StudentId::from_uuid(Uuid::parse_str("22222222-2222-2222-2222-222222222222").unwrap())
}

/// A draft bachelor certificate with fixed descriptive fields
pub fn draft_certificate() -> Certificate {
    Certificate::new(NewCertificate {
        student_id: test_student_id(),
        faculty_id: FacultyId::new(),
        university_id: test_university_id(),
        student_code: "SV2024001".into(),
        kind: CertificateKind::Bachelor,
        name: "Bachelor of Computer Science".into(),
        serial_number: "SN-2024-0001".into(),
        registration_number: "REG-2024-0001".into(),
        issue_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
    })
}

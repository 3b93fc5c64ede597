//! Request and response types for the REST API, with their declared
//! validation rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Capability, Certificate, CertificateKind, CertificateStatus, LedgerAnchor, ScoreInput,
};
use crate::infra::validation::{
    max_len, required, score_rule, FieldRule, FieldValue, Validate,
};

// ============================================================================
// Scores
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateScoreRequest {
    pub student_id: Uuid,
    pub subject_id: Uuid,
    pub semester: String,
    pub attendance: f64,
    pub midterm: f64,
    #[serde(rename = "final")]
    pub final_exam: f64,
}

impl CreateScoreRequest {
    pub fn input(&self) -> ScoreInput {
        ScoreInput {
            attendance: self.attendance,
            midterm: self.midterm,
            final_exam: self.final_exam,
        }
    }
}

impl Validate for CreateScoreRequest {
    fn rules(&self) -> Vec<(FieldRule, FieldValue<'_>)> {
        vec![
            (required("semester"), FieldValue::Text(&self.semester)),
            (max_len("semester", 32), FieldValue::Text(&self.semester)),
            (score_rule("attendance"), FieldValue::Number(self.attendance)),
            (score_rule("midterm"), FieldValue::Number(self.midterm)),
            (score_rule("final"), FieldValue::Number(self.final_exam)),
        ]
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateScoreRequest {
    pub attendance: Option<f64>,
    pub midterm: Option<f64>,
    #[serde(rename = "final")]
    pub final_exam: Option<f64>,
}

impl Validate for UpdateScoreRequest {
    fn rules(&self) -> Vec<(FieldRule, FieldValue<'_>)> {
        vec![
            (
                score_rule("attendance"),
                self.attendance.map_or(FieldValue::Missing, FieldValue::Number),
            ),
            (
                score_rule("midterm"),
                self.midterm.map_or(FieldValue::Missing, FieldValue::Number),
            ),
            (
                score_rule("final"),
                self.final_exam.map_or(FieldValue::Missing, FieldValue::Number),
            ),
        ]
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportScoreRowRequest {
    pub student_code: String,
    pub semester: String,
    pub attendance: f64,
    pub midterm: f64,
    #[serde(rename = "final")]
    pub final_exam: f64,
}

#[derive(Debug, Deserialize)]
pub struct ImportScoresRequest {
    pub subject_code: String,
    pub rows: Vec<ImportScoreRowRequest>,
}

impl Validate for ImportScoresRequest {
    fn rules(&self) -> Vec<(FieldRule, FieldValue<'_>)> {
        // Per-row score ranges are validated row by row during the import so
        // one bad row reports an outcome instead of failing the batch.
        vec![(required("subject_code"), FieldValue::Text(&self.subject_code))]
    }
}

// ============================================================================
// Certificates
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCertificateRequest {
    pub student_code: String,
    pub kind: CertificateKind,
    pub name: String,
    pub serial_number: String,
    pub registration_number: String,
    pub issue_date: NaiveDate,
}

impl Validate for CreateCertificateRequest {
    fn rules(&self) -> Vec<(FieldRule, FieldValue<'_>)> {
        vec![
            (required("student_code"), FieldValue::Text(&self.student_code)),
            (required("name"), FieldValue::Text(&self.name)),
            (max_len("name", 256), FieldValue::Text(&self.name)),
            (required("serial_number"), FieldValue::Text(&self.serial_number)),
            (max_len("serial_number", 64), FieldValue::Text(&self.serial_number)),
            (
                required("registration_number"),
                FieldValue::Text(&self.registration_number),
            ),
            (
                max_len("registration_number", 64),
                FieldValue::Text(&self.registration_number),
            ),
        ]
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchCertificatesQuery {
    pub student_code: Option<String>,
    pub kind: Option<CertificateKind>,
    pub status: Option<CertificateStatus>,
    pub faculty_id: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
pub struct UploadFileQuery {
    pub filename: String,
}

/// Certificate as returned by the API; binary fields are hex-encoded
#[derive(Debug, Serialize)]
pub struct CertificateResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub faculty_id: Uuid,
    pub university_id: Uuid,
    pub student_code: String,
    pub kind: CertificateKind,
    pub name: String,
    pub serial_number: String,
    pub registration_number: String,
    pub issue_date: NaiveDate,
    pub status: CertificateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<LedgerAnchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Certificate> for CertificateResponse {
    fn from(cert: Certificate) -> Self {
        Self {
            id: cert.id.as_uuid(),
            student_id: cert.student_id.as_uuid(),
            faculty_id: cert.faculty_id.as_uuid(),
            university_id: cert.university_id.as_uuid(),
            student_code: cert.student_code,
            kind: cert.kind,
            name: cert.name,
            serial_number: cert.serial_number,
            registration_number: cert.registration_number,
            issue_date: cert.issue_date,
            status: cert.status,
            hash: cert.hash.map(hex::encode),
            signature: cert.signature.map(hex::encode),
            signer_identity: cert.signer_identity,
            anchor: cert.anchor,
            file_path: cert.file_path,
            created_at: cert.created_at,
            updated_at: cert.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchCertificatesResponse {
    pub certificates: Vec<CertificateResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

// ============================================================================
// Verification codes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCodeRequest {
    pub capabilities: Vec<Capability>,
    pub ttl_minutes: i64,
    #[serde(default)]
    pub notify_destination: Option<String>,
}

impl Validate for CreateCodeRequest {
    fn rules(&self) -> Vec<(FieldRule, FieldValue<'_>)> {
        vec![(
            max_len("notify_destination", 256),
            self.notify_destination
                .as_deref()
                .map_or(FieldValue::Missing, FieldValue::Text),
        )]
    }
}

//! PostgreSQL certificate repository.
//!
//! Creation invariants live in the schema: unique (university, serial),
//! unique (university, registration number), and a partial unique index over
//! non-revoked degree rows for the single-instance invariant. A conflicting
//! insert comes back as the matching conflict variant without a separate
//! existence check, so two racing creations cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPool, FromRow, QueryBuilder};
use uuid::Uuid;

use crate::domain::{
    Certificate, CertificateId, CertificateKind, CertificateStatus, FacultyId, Hash256,
    LedgerAnchor, StudentId, UniversityId,
};
use crate::infra::{CertificateFilter, CertificateRepository, EngineError, Result};

use super::{external_db, unique_constraint};

const UNIQUE_SERIAL: &str = "certificates_university_serial_key";
const UNIQUE_REGISTRATION: &str = "certificates_university_registration_key";
const UNIQUE_DEGREE: &str = "certificates_single_degree_key";

/// PostgreSQL-backed certificate storage
pub struct PgCertificateRepository {
    pool: PgPool,
}

impl PgCertificateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CertificateRow {
    id: Uuid,
    student_id: Uuid,
    faculty_id: Uuid,
    university_id: Uuid,
    student_code: String,
    kind: String,
    name: String,
    serial_number: String,
    registration_number: String,
    issue_date: NaiveDate,
    status: String,
    hash: Option<Vec<u8>>,
    signature: Option<Vec<u8>>,
    signer_identity: Option<String>,
    ledger_tx_id: Option<String>,
    ledger_digest: Option<Vec<u8>>,
    ledger_anchored_at: Option<DateTime<Utc>>,
    file_path: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn decode_hash(bytes: Vec<u8>, column: &str) -> Result<Hash256> {
    bytes.try_into().map_err(|_| {
        EngineError::external(
            "decode certificate row",
            false,
            format!("column {column} is not 32 bytes"),
        )
    })
}

impl CertificateRow {
    fn decode(self) -> Result<Certificate> {
        let decode_err = |what: String| EngineError::external("decode certificate row", false, what);

        let kind = CertificateKind::parse(&self.kind)
            .ok_or_else(|| decode_err(format!("unknown certificate kind {:?}", self.kind)))?;
        let status = CertificateStatus::parse(&self.status)
            .ok_or_else(|| decode_err(format!("unknown certificate status {:?}", self.status)))?;

        let hash = self.hash.map(|h| decode_hash(h, "hash")).transpose()?;

        let anchor = match (self.ledger_tx_id, self.ledger_digest, self.ledger_anchored_at) {
            (Some(tx_id), Some(digest), Some(anchored_at)) => Some(LedgerAnchor {
                tx_id,
                digest: decode_hash(digest, "ledger_digest")?,
                anchored_at,
            }),
            (None, None, None) => None,
            _ => {
                return Err(decode_err(
                    "ledger columns are partially populated".to_string(),
                ))
            }
        };

        Ok(Certificate {
            id: CertificateId::from_uuid(self.id),
            student_id: StudentId::from_uuid(self.student_id),
            faculty_id: FacultyId::from_uuid(self.faculty_id),
            university_id: UniversityId::from_uuid(self.university_id),
            student_code: self.student_code,
            kind,
            name: self.name,
            serial_number: self.serial_number,
            registration_number: self.registration_number,
            issue_date: self.issue_date,
            status,
            hash,
            signature: self.signature,
            signer_identity: self.signer_identity,
            anchor,
            file_path: self.file_path,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn map_insert_conflict(err: sqlx::Error, certificate: &Certificate) -> EngineError {
    match unique_constraint(&err).as_deref() {
        Some(UNIQUE_SERIAL) => EngineError::DuplicateSerialNumber {
            serial_number: certificate.serial_number.clone(),
        },
        Some(UNIQUE_REGISTRATION) => EngineError::DuplicateRegistrationNumber {
            registration_number: certificate.registration_number.clone(),
        },
        Some(UNIQUE_DEGREE) => EngineError::DuplicateDegree {
            student_code: certificate.student_code.clone(),
            kind: certificate.kind.to_string(),
        },
        _ => external_db("insert certificate", err),
    }
}

#[async_trait]
impl CertificateRepository for PgCertificateRepository {
    async fn insert(&self, certificate: &Certificate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO certificates (
                id, student_id, faculty_id, university_id, student_code,
                kind, name, serial_number, registration_number, issue_date,
                status, hash, signature, signer_identity,
                ledger_tx_id, ledger_digest, ledger_anchored_at,
                file_path, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
            )
            "#,
        )
        .bind(certificate.id.as_uuid())
        .bind(certificate.student_id.as_uuid())
        .bind(certificate.faculty_id.as_uuid())
        .bind(certificate.university_id.as_uuid())
        .bind(&certificate.student_code)
        .bind(certificate.kind.as_str())
        .bind(&certificate.name)
        .bind(&certificate.serial_number)
        .bind(&certificate.registration_number)
        .bind(certificate.issue_date)
        .bind(certificate.status.as_str())
        .bind(certificate.hash.as_ref().map(|h| h.to_vec()))
        .bind(certificate.signature.as_ref())
        .bind(certificate.signer_identity.as_ref())
        .bind(certificate.anchor.as_ref().map(|a| a.tx_id.clone()))
        .bind(certificate.anchor.as_ref().map(|a| a.digest.to_vec()))
        .bind(certificate.anchor.as_ref().map(|a| a.anchored_at))
        .bind(certificate.file_path.as_ref())
        .bind(certificate.created_at)
        .bind(certificate.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_conflict(e, certificate))?;

        Ok(())
    }

    async fn update(&self, certificate: &Certificate) -> Result<()> {
        // Lifecycle fields are written in one statement so a concurrent
        // reader never observes a partially anchored certificate.
        let result = sqlx::query(
            r#"
            UPDATE certificates SET
                status = $2, hash = $3, signature = $4, signer_identity = $5,
                ledger_tx_id = $6, ledger_digest = $7, ledger_anchored_at = $8,
                file_path = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(certificate.id.as_uuid())
        .bind(certificate.status.as_str())
        .bind(certificate.hash.as_ref().map(|h| h.to_vec()))
        .bind(certificate.signature.as_ref())
        .bind(certificate.signer_identity.as_ref())
        .bind(certificate.anchor.as_ref().map(|a| a.tx_id.clone()))
        .bind(certificate.anchor.as_ref().map(|a| a.digest.to_vec()))
        .bind(certificate.anchor.as_ref().map(|a| a.anchored_at))
        .bind(certificate.file_path.as_ref())
        .bind(certificate.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| external_db("update certificate", e))?;

        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("certificate", certificate.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: CertificateId) -> Result<Option<Certificate>> {
        let row: Option<CertificateRow> =
            sqlx::query_as("SELECT * FROM certificates WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| external_db("find certificate", e))?;

        row.map(CertificateRow::decode).transpose()
    }

    async fn find_by_serial(
        &self,
        university_id: UniversityId,
        serial_number: &str,
    ) -> Result<Option<Certificate>> {
        let row: Option<CertificateRow> = sqlx::query_as(
            "SELECT * FROM certificates WHERE university_id = $1 AND serial_number = $2",
        )
        .bind(university_id.as_uuid())
        .bind(serial_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| external_db("find certificate by serial", e))?;

        row.map(CertificateRow::decode).transpose()
    }

    async fn list_by_student(&self, student_id: StudentId) -> Result<Vec<Certificate>> {
        let rows: Vec<CertificateRow> = sqlx::query_as(
            "SELECT * FROM certificates WHERE student_id = $1 ORDER BY created_at DESC",
        )
        .bind(student_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| external_db("list certificates by student", e))?;

        rows.into_iter().map(CertificateRow::decode).collect()
    }

    async fn search(
        &self,
        university_id: UniversityId,
        filter: &CertificateFilter,
    ) -> Result<(Vec<Certificate>, u64)> {
        let mut count_query = QueryBuilder::new(
            "SELECT COUNT(*) FROM certificates WHERE university_id = ",
        );
        push_filter(&mut count_query, university_id, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| external_db("count certificates", e))?;

        let page_size = filter.page_size.max(1);
        let offset = u64::from(filter.page.saturating_sub(1)) * u64::from(page_size);

        let mut query = QueryBuilder::new("SELECT * FROM certificates WHERE university_id = ");
        push_filter(&mut query, university_id, filter);
        query.push(" ORDER BY created_at DESC LIMIT ");
        query.push_bind(i64::from(page_size));
        query.push(" OFFSET ");
        query.push_bind(offset as i64);

        let rows: Vec<CertificateRow> = query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| external_db("search certificates", e))?;

        let certificates = rows
            .into_iter()
            .map(CertificateRow::decode)
            .collect::<Result<Vec<_>>>()?;

        Ok((certificates, total as u64))
    }
}

fn push_filter(
    query: &mut QueryBuilder<'_, sqlx::Postgres>,
    university_id: UniversityId,
    filter: &CertificateFilter,
) {
    query.push_bind(university_id.as_uuid());

    if let Some(student_code) = &filter.student_code {
        query.push(" AND student_code = ");
        query.push_bind(student_code.clone());
    }
    if let Some(kind) = filter.kind {
        query.push(" AND kind = ");
        query.push_bind(kind.as_str());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ");
        query.push_bind(status.as_str());
    }
    if let Some(faculty_id) = filter.faculty_id {
        query.push(" AND faculty_id = ");
        query.push_bind(faculty_id.as_uuid());
    }
}

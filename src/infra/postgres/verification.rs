//! PostgreSQL verification code repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, FromRow};
use uuid::Uuid;

use crate::domain::{Capability, StudentId, VerificationCode, VerificationCodeId};
use crate::infra::{EngineError, Result, VerificationCodeRepository};

use super::external_db;

/// PostgreSQL-backed verification code storage
pub struct PgVerificationCodeRepository {
    pool: PgPool,
}

impl PgVerificationCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CodeRow {
    id: Uuid,
    owner_id: Uuid,
    code: String,
    can_view_score: bool,
    can_view_data: bool,
    can_view_file: bool,
    viewed_score: bool,
    viewed_data: bool,
    viewed_file: bool,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<CodeRow> for VerificationCode {
    fn from(row: CodeRow) -> Self {
        VerificationCode {
            id: VerificationCodeId::from_uuid(row.id),
            owner_id: StudentId::from_uuid(row.owner_id),
            code: row.code,
            can_view_score: row.can_view_score,
            can_view_data: row.can_view_data,
            can_view_file: row.can_view_file,
            viewed_score: row.viewed_score,
            viewed_data: row.viewed_data,
            viewed_file: row.viewed_file,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl VerificationCodeRepository for PgVerificationCodeRepository {
    async fn insert(&self, code: &VerificationCode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_codes (
                id, owner_id, code,
                can_view_score, can_view_data, can_view_file,
                viewed_score, viewed_data, viewed_file,
                expires_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(code.id.as_uuid())
        .bind(code.owner_id.as_uuid())
        .bind(&code.code)
        .bind(code.can_view_score)
        .bind(code.can_view_data)
        .bind(code.can_view_file)
        .bind(code.viewed_score)
        .bind(code.viewed_data)
        .bind(code.viewed_file)
        .bind(code.expires_at)
        .bind(code.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| external_db("insert verification code", e))?;

        Ok(())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<VerificationCode>> {
        let row: Option<CodeRow> =
            sqlx::query_as("SELECT * FROM verification_codes WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| external_db("find verification code", e))?;

        Ok(row.map(VerificationCode::from))
    }

    async fn list_by_owner(&self, owner_id: StudentId) -> Result<Vec<VerificationCode>> {
        let rows: Vec<CodeRow> = sqlx::query_as(
            "SELECT * FROM verification_codes WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| external_db("list verification codes", e))?;

        Ok(rows.into_iter().map(VerificationCode::from).collect())
    }

    async fn mark_viewed(&self, id: VerificationCodeId, capability: Capability) -> Result<()> {
        let column = match capability {
            Capability::ViewScore => "viewed_score",
            Capability::ViewData => "viewed_data",
            Capability::ViewFile => "viewed_file",
        };

        let result = sqlx::query(&format!(
            "UPDATE verification_codes SET {column} = TRUE WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| external_db("mark verification code viewed", e))?;

        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("verification code", id));
        }
        Ok(())
    }
}

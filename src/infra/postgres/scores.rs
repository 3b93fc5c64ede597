//! PostgreSQL score repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, FromRow};
use uuid::Uuid;

use crate::domain::{LetterGrade, ScoreId, ScoreRecord, StudentId, SubjectId};
use crate::infra::{EngineError, Result, ScoreRepository};

use super::{external_db, unique_constraint};

const UNIQUE_TRIPLE: &str = "scores_student_subject_semester_key";

/// PostgreSQL-backed score storage
pub struct PgScoreRepository {
    pool: PgPool,
}

impl PgScoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ScoreRow {
    id: Uuid,
    student_id: Uuid,
    subject_id: Uuid,
    semester: String,
    attendance: f64,
    midterm: f64,
    final_exam: f64,
    process_score: f64,
    total_score: f64,
    letter_grade: String,
    passed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ScoreRow {
    fn decode(self) -> Result<ScoreRecord> {
        let letter_grade = LetterGrade::parse(&self.letter_grade).ok_or_else(|| {
            EngineError::external(
                "decode score row",
                false,
                format!("unknown letter grade {:?}", self.letter_grade),
            )
        })?;

        Ok(ScoreRecord {
            id: ScoreId::from_uuid(self.id),
            student_id: StudentId::from_uuid(self.student_id),
            subject_id: SubjectId::from_uuid(self.subject_id),
            semester: self.semester,
            attendance: self.attendance,
            midterm: self.midterm,
            final_exam: self.final_exam,
            process_score: self.process_score,
            total_score: self.total_score,
            letter_grade,
            passed: self.passed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl ScoreRepository for PgScoreRepository {
    async fn insert(&self, record: &ScoreRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scores (
                id, student_id, subject_id, semester,
                attendance, midterm, final_exam,
                process_score, total_score, letter_grade, passed,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.student_id.as_uuid())
        .bind(record.subject_id.as_uuid())
        .bind(&record.semester)
        .bind(record.attendance)
        .bind(record.midterm)
        .bind(record.final_exam)
        .bind(record.process_score)
        .bind(record.total_score)
        .bind(record.letter_grade.as_str())
        .bind(record.passed)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match unique_constraint(&e).as_deref() {
            Some(UNIQUE_TRIPLE) => EngineError::DuplicateScore {
                student_id: record.student_id,
                subject_id: record.subject_id,
                semester: record.semester.clone(),
            },
            _ => external_db("insert score", e),
        })?;

        Ok(())
    }

    async fn update(&self, record: &ScoreRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE scores SET
                attendance = $2, midterm = $3, final_exam = $4,
                process_score = $5, total_score = $6,
                letter_grade = $7, passed = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.attendance)
        .bind(record.midterm)
        .bind(record.final_exam)
        .bind(record.process_score)
        .bind(record.total_score)
        .bind(record.letter_grade.as_str())
        .bind(record.passed)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| external_db("update score", e))?;

        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("score", record.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: ScoreId) -> Result<Option<ScoreRecord>> {
        let row: Option<ScoreRow> = sqlx::query_as("SELECT * FROM scores WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| external_db("find score", e))?;

        row.map(ScoreRow::decode).transpose()
    }

    async fn list_by_student(&self, student_id: StudentId) -> Result<Vec<ScoreRecord>> {
        let rows: Vec<ScoreRow> = sqlx::query_as(
            "SELECT * FROM scores WHERE student_id = $1 ORDER BY semester, created_at",
        )
        .bind(student_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| external_db("list scores by student", e))?;

        rows.into_iter().map(ScoreRow::decode).collect()
    }

    async fn list_by_subject(&self, subject_id: SubjectId) -> Result<Vec<ScoreRecord>> {
        let rows: Vec<ScoreRow> = sqlx::query_as(
            "SELECT * FROM scores WHERE subject_id = $1 ORDER BY semester, created_at",
        )
        .bind(subject_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| external_db("list scores by subject", e))?;

        rows.into_iter().map(ScoreRow::decode).collect()
    }
}

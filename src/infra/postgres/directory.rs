//! PostgreSQL directory lookups for students, subjects, faculties and
//! universities. Read-only reference data.

use async_trait::async_trait;
use sqlx::{postgres::PgPool, FromRow};
use uuid::Uuid;

use crate::domain::{
    Faculty, FacultyId, Student, StudentId, Subject, SubjectId, University, UniversityId,
};
use crate::infra::{InstitutionDirectory, Result, StudentDirectory, SubjectCatalog};

use super::external_db;

/// PostgreSQL-backed student directory
pub struct PgStudentDirectory {
    pool: PgPool,
}

impl PgStudentDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct StudentRow {
    id: Uuid,
    student_code: String,
    full_name: String,
    faculty_id: Option<Uuid>,
    university_id: Uuid,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: StudentId::from_uuid(row.id),
            student_code: row.student_code,
            full_name: row.full_name,
            faculty_id: row.faculty_id.map(FacultyId::from_uuid),
            university_id: UniversityId::from_uuid(row.university_id),
        }
    }
}

#[async_trait]
impl StudentDirectory for PgStudentDirectory {
    async fn find_by_id(&self, id: StudentId) -> Result<Option<Student>> {
        let row: Option<StudentRow> = sqlx::query_as(
            "SELECT id, student_code, full_name, faculty_id, university_id FROM students WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| external_db("find student", e))?;

        Ok(row.map(Student::from))
    }

    async fn find_by_code(
        &self,
        university_id: UniversityId,
        student_code: &str,
    ) -> Result<Option<Student>> {
        let row: Option<StudentRow> = sqlx::query_as(
            r#"
            SELECT id, student_code, full_name, faculty_id, university_id
            FROM students WHERE university_id = $1 AND student_code = $2
            "#,
        )
        .bind(university_id.as_uuid())
        .bind(student_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| external_db("find student by code", e))?;

        Ok(row.map(Student::from))
    }
}

/// PostgreSQL-backed subject catalog
pub struct PgSubjectCatalog {
    pool: PgPool,
}

impl PgSubjectCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SubjectRow {
    id: Uuid,
    code: String,
    name: String,
    credit: i32,
    faculty_id: Uuid,
}

impl From<SubjectRow> for Subject {
    fn from(row: SubjectRow) -> Self {
        Subject {
            id: SubjectId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            credit: row.credit.max(0) as u32,
            faculty_id: FacultyId::from_uuid(row.faculty_id),
        }
    }
}

#[async_trait]
impl SubjectCatalog for PgSubjectCatalog {
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>> {
        let row: Option<SubjectRow> = sqlx::query_as(
            "SELECT id, code, name, credit, faculty_id FROM subjects WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| external_db("find subject", e))?;

        Ok(row.map(Subject::from))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Subject>> {
        let row: Option<SubjectRow> = sqlx::query_as(
            "SELECT id, code, name, credit, faculty_id FROM subjects WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| external_db("find subject by code", e))?;

        Ok(row.map(Subject::from))
    }
}

/// PostgreSQL-backed faculty/university directory
pub struct PgInstitutionDirectory {
    pool: PgPool,
}

impl PgInstitutionDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct FacultyRow {
    id: Uuid,
    code: String,
    name: String,
    university_id: Uuid,
}

#[derive(FromRow)]
struct UniversityRow {
    id: Uuid,
    code: String,
    name: String,
}

#[async_trait]
impl InstitutionDirectory for PgInstitutionDirectory {
    async fn find_faculty(&self, id: FacultyId) -> Result<Option<Faculty>> {
        let row: Option<FacultyRow> =
            sqlx::query_as("SELECT id, code, name, university_id FROM faculties WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| external_db("find faculty", e))?;

        Ok(row.map(|row| Faculty {
            id: FacultyId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            university_id: UniversityId::from_uuid(row.university_id),
        }))
    }

    async fn find_university(&self, id: UniversityId) -> Result<Option<University>> {
        let row: Option<UniversityRow> =
            sqlx::query_as("SELECT id, code, name FROM universities WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| external_db("find university", e))?;

        Ok(row.map(|row| University {
            id: UniversityId::from_uuid(row.id),
            code: row.code,
            name: row.name,
        }))
    }
}

//! Score and CGPA orchestration.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::domain::{
    CgpaSummary, ScoreId, ScoreInput, ScorePatch, ScoreRecord, StudentId, SubjectId, UniversityId,
};
use crate::infra::{
    EngineError, Result, ScoreRepository, StudentDirectory, SubjectCatalog,
};

/// One score row joined with its student and subject reference data
#[derive(Debug, Clone, Serialize)]
pub struct ScoreView {
    #[serde(flatten)]
    pub record: ScoreRecord,
    pub student_name: String,
    pub subject_name: String,
    pub credit: u32,
}

/// One row of a batch score import
#[derive(Debug, Clone)]
pub struct ImportScoreRow {
    pub student_code: String,
    pub semester: String,
    pub input: ScoreInput,
}

/// Per-row outcome of a batch import
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ImportStatus {
    Imported { score_id: ScoreId },
    UnknownStudent,
    Duplicate,
    Invalid { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub student_code: String,
    pub semester: String,
    #[serde(flatten)]
    pub status: ImportStatus,
}

/// Orchestrates score creation, patching, listing and CGPA aggregation
pub struct ScoreService {
    scores: Arc<dyn ScoreRepository>,
    students: Arc<dyn StudentDirectory>,
    subjects: Arc<dyn SubjectCatalog>,
}

impl ScoreService {
    pub fn new(
        scores: Arc<dyn ScoreRepository>,
        students: Arc<dyn StudentDirectory>,
        subjects: Arc<dyn SubjectCatalog>,
    ) -> Self {
        Self {
            scores,
            students,
            subjects,
        }
    }

    /// Create one score record. The (student, subject, semester) uniqueness
    /// race is arbitrated by the repository's atomic insert.
    pub async fn create(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
        semester: &str,
        input: ScoreInput,
    ) -> Result<ScoreRecord> {
        self.students
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| EngineError::not_found("student", student_id))?;
        self.subjects
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| EngineError::not_found("subject", subject_id))?;

        let record = ScoreRecord::new(student_id, subject_id, semester, input)?;
        self.scores.insert(&record).await?;

        info!(score_id = %record.id, student_id = %student_id, %semester, "score created");
        Ok(record)
    }

    /// Patch raw sub-scores; all derived fields are recomputed.
    pub async fn update(&self, id: ScoreId, patch: ScorePatch) -> Result<ScoreRecord> {
        if patch.is_empty() {
            return Err(EngineError::Validation {
                field: "patch",
                message: "no fields to update".to_string(),
            });
        }

        let mut record = self
            .scores
            .find_by_id(id)
            .await?
            .ok_or_else(|| EngineError::not_found("score", id))?;

        record.apply(patch)?;
        self.scores.update(&record).await?;
        Ok(record)
    }

    /// Import a batch of rows for one subject. Each row resolves the student
    /// by code within the university and reports its own outcome; a bad row
    /// never aborts the batch.
    pub async fn import(
        &self,
        university_id: UniversityId,
        subject_code: &str,
        rows: Vec<ImportScoreRow>,
    ) -> Result<Vec<ImportOutcome>> {
        let subject = self
            .subjects
            .find_by_code(subject_code)
            .await?
            .ok_or_else(|| EngineError::not_found("subject", subject_code))?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            let status = self.import_row(university_id, subject.id, &row).await;
            outcomes.push(ImportOutcome {
                student_code: row.student_code,
                semester: row.semester,
                status,
            });
        }
        Ok(outcomes)
    }

    async fn import_row(
        &self,
        university_id: UniversityId,
        subject_id: SubjectId,
        row: &ImportScoreRow,
    ) -> ImportStatus {
        let student = match self
            .students
            .find_by_code(university_id, &row.student_code)
            .await
        {
            Ok(Some(student)) => student,
            Ok(None) => return ImportStatus::UnknownStudent,
            Err(e) => {
                return ImportStatus::Invalid {
                    message: e.to_string(),
                }
            }
        };

        let record = match ScoreRecord::new(student.id, subject_id, &row.semester, row.input) {
            Ok(record) => record,
            Err(e) => {
                return ImportStatus::Invalid {
                    message: e.to_string(),
                }
            }
        };

        match self.scores.insert(&record).await {
            Ok(()) => ImportStatus::Imported {
                score_id: record.id,
            },
            Err(e) if e.is_conflict() => ImportStatus::Duplicate,
            Err(e) => ImportStatus::Invalid {
                message: e.to_string(),
            },
        }
    }

    /// All of a student's scores, joined with subject reference data.
    /// Records whose subject is no longer resolvable are skipped.
    pub async fn scores_for_student(&self, student_id: StudentId) -> Result<Vec<ScoreView>> {
        let student = self
            .students
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| EngineError::not_found("student", student_id))?;

        let records = self.scores.list_by_student(student_id).await?;
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let Some(subject) = self.subjects.find_by_id(record.subject_id).await? else {
                continue;
            };
            views.push(ScoreView {
                record,
                student_name: student.full_name.clone(),
                subject_name: subject.name,
                credit: subject.credit,
            });
        }
        Ok(views)
    }

    /// All scores recorded for one subject, joined with student names
    pub async fn scores_for_subject(&self, subject_id: SubjectId) -> Result<Vec<ScoreView>> {
        let subject = self
            .subjects
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| EngineError::not_found("subject", subject_id))?;

        let records = self.scores.list_by_subject(subject_id).await?;
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let Some(student) = self.students.find_by_id(record.student_id).await? else {
                continue;
            };
            views.push(ScoreView {
                record,
                student_name: student.full_name,
                subject_name: subject.name.clone(),
                credit: subject.credit,
            });
        }
        Ok(views)
    }

    /// Cumulative GPA over the student's full score history
    pub async fn cgpa(&self, student_id: StudentId) -> Result<CgpaSummary> {
        let records = self.scores.list_by_student(student_id).await?;
        if records.is_empty() {
            return Ok(CgpaSummary::empty());
        }

        let mut triples = Vec::with_capacity(records.len());
        for record in &records {
            let Some(subject) = self.subjects.find_by_id(record.subject_id).await? else {
                continue;
            };
            triples.push((record.letter_grade, subject.credit, record.passed));
        }

        Ok(CgpaSummary::aggregate(triples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LetterGrade, Student, Subject, FacultyId};
    use crate::infra::{MockScoreRepository, MockStudentDirectory, MockSubjectCatalog};
    use mockall::predicate::eq;

    fn student(id: StudentId) -> Student {
        Student {
            id,
            student_code: "SV001".into(),
            full_name: "Alex Doe".into(),
            faculty_id: Some(FacultyId::new()),
            university_id: UniversityId::new(),
        }
    }

    fn subject(id: SubjectId, credit: u32) -> Subject {
        Subject {
            id,
            code: "CS101".into(),
            name: "Algorithms".into(),
            credit,
            faculty_id: FacultyId::new(),
        }
    }

    fn input(attendance: f64, midterm: f64, final_exam: f64) -> ScoreInput {
        ScoreInput {
            attendance,
            midterm,
            final_exam,
        }
    }

    fn service(
        scores: MockScoreRepository,
        students: MockStudentDirectory,
        subjects: MockSubjectCatalog,
    ) -> ScoreService {
        ScoreService::new(Arc::new(scores), Arc::new(students), Arc::new(subjects))
    }

    #[tokio::test]
    async fn create_computes_derived_fields_and_inserts() {
        let student_id = StudentId::new();
        let subject_id = SubjectId::new();

        let mut students = MockStudentDirectory::new();
        students
            .expect_find_by_id()
            .with(eq(student_id))
            .returning(move |id| Ok(Some(student(id))));

        let mut subjects = MockSubjectCatalog::new();
        subjects
            .expect_find_by_id()
            .with(eq(subject_id))
            .returning(move |id| Ok(Some(subject(id, 3))));

        let mut scores = MockScoreRepository::new();
        scores
            .expect_insert()
            .withf(|record| record.total_score == 6.4 && record.letter_grade == LetterGrade::CPlus)
            .returning(|_| Ok(()));

        let record = service(scores, students, subjects)
            .create(student_id, subject_id, "2024-1", input(8.0, 7.0, 6.0))
            .await
            .unwrap();

        assert!(record.passed);
    }

    #[tokio::test]
    async fn create_rejects_unknown_student() {
        let mut students = MockStudentDirectory::new();
        students.expect_find_by_id().returning(|_| Ok(None));

        let service = service(
            MockScoreRepository::new(),
            students,
            MockSubjectCatalog::new(),
        );
        let err = service
            .create(StudentId::new(), SubjectId::new(), "2024-1", input(5.0, 5.0, 5.0))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::NotFound { entity: "student", .. }));
    }

    #[tokio::test]
    async fn duplicate_triple_surfaces_as_conflict() {
        let student_id = StudentId::new();
        let subject_id = SubjectId::new();

        let mut students = MockStudentDirectory::new();
        students.expect_find_by_id().returning(move |id| Ok(Some(student(id))));
        let mut subjects = MockSubjectCatalog::new();
        subjects.expect_find_by_id().returning(move |id| Ok(Some(subject(id, 3))));

        let mut scores = MockScoreRepository::new();
        scores.expect_insert().returning(move |record| {
            Err(EngineError::DuplicateScore {
                student_id: record.student_id,
                subject_id: record.subject_id,
                semester: record.semester.clone(),
            })
        });

        let err = service(scores, students, subjects)
            .create(student_id, subject_id, "2024-1", input(5.0, 5.0, 5.0))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn empty_patch_is_a_validation_error() {
        let service = service(
            MockScoreRepository::new(),
            MockStudentDirectory::new(),
            MockSubjectCatalog::new(),
        );
        let err = service
            .update(ScoreId::new(), ScorePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "patch", .. }));
    }

    #[tokio::test]
    async fn update_recomputes_and_persists() {
        let id = ScoreId::new();
        let existing = ScoreRecord::new(
            StudentId::new(),
            SubjectId::new(),
            "2024-1",
            input(8.0, 7.0, 6.0),
        )
        .unwrap();

        let mut scores = MockScoreRepository::new();
        let seed = existing.clone();
        scores
            .expect_find_by_id()
            .returning(move |_| Ok(Some(seed.clone())));
        scores
            .expect_update()
            .withf(|record| record.final_exam == 9.5 && record.total_score == 8.8)
            .returning(|_| Ok(()));

        let record = service(scores, MockStudentDirectory::new(), MockSubjectCatalog::new())
            .update(
                id,
                ScorePatch {
                    final_exam: Some(9.5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.letter_grade, LetterGrade::A);
    }

    #[tokio::test]
    async fn import_reports_per_row_outcomes() {
        let university_id = UniversityId::new();
        let subject_id = SubjectId::new();

        let mut subjects = MockSubjectCatalog::new();
        subjects
            .expect_find_by_code()
            .with(eq("CS101"))
            .returning(move |_| Ok(Some(subject(subject_id, 3))));

        let mut students = MockStudentDirectory::new();
        students
            .expect_find_by_code()
            .returning(move |_, code| match code {
                "SV001" => Ok(Some(student(StudentId::new()))),
                "SV002" => Ok(Some(student(StudentId::new()))),
                _ => Ok(None),
            });

        let mut scores = MockScoreRepository::new();
        let mut first = true;
        scores.expect_insert().returning(move |record| {
            if std::mem::take(&mut first) {
                Ok(())
            } else {
                Err(EngineError::DuplicateScore {
                    student_id: record.student_id,
                    subject_id: record.subject_id,
                    semester: record.semester.clone(),
                })
            }
        });

        let rows = vec![
            ImportScoreRow {
                student_code: "SV001".into(),
                semester: "2024-1".into(),
                input: input(8.0, 7.0, 6.0),
            },
            ImportScoreRow {
                student_code: "SV002".into(),
                semester: "2024-1".into(),
                input: input(7.0, 6.0, 5.0),
            },
            ImportScoreRow {
                student_code: "SV999".into(),
                semester: "2024-1".into(),
                input: input(7.0, 6.0, 5.0),
            },
        ];

        let outcomes = service(scores, students, subjects)
            .import(university_id, "CS101", rows)
            .await
            .unwrap();

        assert!(matches!(outcomes[0].status, ImportStatus::Imported { .. }));
        assert!(matches!(outcomes[1].status, ImportStatus::Duplicate));
        assert!(matches!(outcomes[2].status, ImportStatus::UnknownStudent));
    }

    #[tokio::test]
    async fn cgpa_skips_failed_subject_credits() {
        let student_id = StudentId::new();
        let passed_subject = SubjectId::new();
        let failed_subject = SubjectId::new();

        let passed = ScoreRecord::new(student_id, passed_subject, "2024-1", input(9.0, 9.0, 9.5))
            .unwrap();
        let failed = ScoreRecord::new(student_id, failed_subject, "2024-1", input(2.0, 2.0, 1.0))
            .unwrap();
        assert!(passed.passed && !failed.passed);

        let mut scores = MockScoreRepository::new();
        let history = vec![passed, failed];
        scores
            .expect_list_by_student()
            .returning(move |_| Ok(history.clone()));

        let mut subjects = MockSubjectCatalog::new();
        subjects
            .expect_find_by_id()
            .returning(move |id| Ok(Some(subject(id, 3))));

        let summary = service(scores, MockStudentDirectory::new(), subjects)
            .cgpa(student_id)
            .await
            .unwrap();

        assert_eq!(summary.total_subjects, 2);
        assert_eq!(summary.total_credits, 3);
        assert_eq!(summary.total_failed_subjects, 1);
    }

    #[tokio::test]
    async fn cgpa_of_no_history_is_empty() {
        let mut scores = MockScoreRepository::new();
        scores.expect_list_by_student().returning(|_| Ok(vec![]));

        let summary = service(scores, MockStudentDirectory::new(), MockSubjectCatalog::new())
            .cgpa(StudentId::new())
            .await
            .unwrap();

        assert_eq!(summary, CgpaSummary::empty());
    }
}

//! Per-subject score records.
//!
//! A record is keyed by the (student, subject, semester) triple. The derived
//! fields are never stored independently of the raw sub-scores: every create
//! or patch goes back through the grade calculator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::grade::{self, LetterGrade};
use super::types::{ScoreId, StudentId, SubjectId};
use crate::infra::Result;

/// Raw sub-scores for one (student, subject, semester)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreInput {
    pub attendance: f64,
    pub midterm: f64,
    pub final_exam: f64,
}

/// Partial update of the raw sub-scores; absent fields keep their value
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ScorePatch {
    pub attendance: Option<f64>,
    pub midterm: Option<f64>,
    pub final_exam: Option<f64>,
}

impl ScorePatch {
    pub fn is_empty(&self) -> bool {
        self.attendance.is_none() && self.midterm.is_none() && self.final_exam.is_none()
    }
}

/// One student's result in one subject for one semester
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: ScoreId,
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub semester: String,

    pub attendance: f64,
    pub midterm: f64,
    pub final_exam: f64,

    pub process_score: f64,
    pub total_score: f64,
    pub letter_grade: LetterGrade,
    pub passed: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoreRecord {
    /// Create a record with all derived fields computed. Rejects
    /// out-of-range sub-scores.
    pub fn new(
        student_id: StudentId,
        subject_id: SubjectId,
        semester: impl Into<String>,
        input: ScoreInput,
    ) -> Result<Self> {
        let outcome = grade::grade(input.attendance, input.midterm, input.final_exam)?;
        let now = Utc::now();

        Ok(Self {
            id: ScoreId::new(),
            student_id,
            subject_id,
            semester: semester.into(),
            attendance: input.attendance,
            midterm: input.midterm,
            final_exam: input.final_exam,
            process_score: outcome.process_score,
            total_score: outcome.total_score,
            letter_grade: outcome.letter_grade,
            passed: outcome.passed,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch to the raw sub-scores and recompute every derived field.
    pub fn apply(&mut self, patch: ScorePatch) -> Result<()> {
        let attendance = patch.attendance.unwrap_or(self.attendance);
        let midterm = patch.midterm.unwrap_or(self.midterm);
        let final_exam = patch.final_exam.unwrap_or(self.final_exam);

        let outcome = grade::grade(attendance, midterm, final_exam)?;

        self.attendance = attendance;
        self.midterm = midterm;
        self.final_exam = final_exam;
        self.process_score = outcome.process_score;
        self.total_score = outcome.total_score;
        self.letter_grade = outcome.letter_grade;
        self.passed = outcome.passed;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::EngineError;

    fn sample() -> ScoreRecord {
        ScoreRecord::new(
            StudentId::new(),
            SubjectId::new(),
            "2024-1",
            ScoreInput {
                attendance: 8.0,
                midterm: 7.0,
                final_exam: 6.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn new_record_carries_derived_fields() {
        let record = sample();
        assert_eq!(record.process_score, 7.3);
        assert_eq!(record.total_score, 6.4);
        assert_eq!(record.letter_grade, LetterGrade::CPlus);
        assert!(record.passed);
    }

    #[test]
    fn patch_recomputes_everything() {
        let mut record = sample();
        record
            .apply(ScorePatch {
                final_exam: Some(9.5),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(record.final_exam, 9.5);
        // process unchanged, total recomputed: round1(0.3*7.3 + 0.7*9.5) = 8.8
        assert_eq!(record.process_score, 7.3);
        assert_eq!(record.total_score, 8.8);
        assert_eq!(record.letter_grade, LetterGrade::A);
    }

    #[test]
    fn patch_rejects_bad_values_without_mutating() {
        let mut record = sample();
        let before = record.clone();
        let err = record
            .apply(ScorePatch {
                midterm: Some(11.0),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation { field: "midterm", .. }));
        assert_eq!(record.midterm, before.midterm);
        assert_eq!(record.total_score, before.total_score);
    }
}

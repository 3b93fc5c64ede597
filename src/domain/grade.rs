//! Grade derivation and CGPA aggregation.
//!
//! The grade calculator is pure: raw sub-scores in, derived scores and a
//! letter grade out. No I/O, no side effects. Inputs outside [0, 10] are
//! rejected before anything is computed.
//!
//! Score weighting:
//!
//! ```text
//! process_score = round1(0.3 * attendance + 0.7 * midterm)
//! total_score   = round1(0.3 * process_score + 0.7 * final)
//! passed        = final >= 2.0 && total_score >= 4.0
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::infra::{EngineError, Result};

/// Round to one decimal place, half away from zero
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Letter grade over a total, non-overlapping partition of [0, 10].
///
/// Every total score maps to exactly one letter, and every letter has a
/// defined 4.0-scale value, so no score can fall through the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "F")]
    F,
}

impl LetterGrade {
    /// Map a total score to its letter. Highest matching threshold wins.
    pub fn from_total(total: f64) -> Self {
        if total >= 9.0 {
            LetterGrade::APlus
        } else if total >= 8.5 {
            LetterGrade::A
        } else if total >= 7.8 {
            LetterGrade::BPlus
        } else if total >= 7.0 {
            LetterGrade::B
        } else if total >= 6.3 {
            LetterGrade::CPlus
        } else if total >= 5.5 {
            LetterGrade::C
        } else if total >= 4.8 {
            LetterGrade::DPlus
        } else if total >= 4.0 {
            LetterGrade::D
        } else {
            LetterGrade::F
        }
    }

    /// 4.0-scale value used by the CGPA aggregation.
    pub fn grade_points(&self) -> f64 {
        match self {
            LetterGrade::APlus => 4.0,
            LetterGrade::A => 3.8,
            LetterGrade::BPlus => 3.5,
            LetterGrade::B => 3.0,
            LetterGrade::CPlus => 2.4,
            LetterGrade::C => 2.0,
            LetterGrade::DPlus => 1.5,
            LetterGrade::D => 1.0,
            LetterGrade::F => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::APlus => "A+",
            LetterGrade::A => "A",
            LetterGrade::BPlus => "B+",
            LetterGrade::B => "B",
            LetterGrade::CPlus => "C+",
            LetterGrade::C => "C",
            LetterGrade::DPlus => "D+",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A+" => Some(LetterGrade::APlus),
            "A" => Some(LetterGrade::A),
            "B+" => Some(LetterGrade::BPlus),
            "B" => Some(LetterGrade::B),
            "C+" => Some(LetterGrade::CPlus),
            "C" => Some(LetterGrade::C),
            "D+" => Some(LetterGrade::DPlus),
            "D" => Some(LetterGrade::D),
            "F" => Some(LetterGrade::F),
            _ => None,
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived values for one (attendance, midterm, final) triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeOutcome {
    /// Weighted pre-final assessment value, one decimal place
    pub process_score: f64,

    /// Final weighted total, one decimal place
    pub total_score: f64,

    /// Letter from the fixed threshold table
    pub letter_grade: LetterGrade,

    /// Pass requires both a minimum final exam score and a minimum total
    pub passed: bool,
}

fn check_range(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=10.0).contains(&value) {
        return Err(EngineError::Validation {
            field,
            message: format!("must be within [0, 10], got {value}"),
        });
    }
    Ok(())
}

/// Derive process score, total score, letter grade and pass flag.
pub fn grade(attendance: f64, midterm: f64, final_exam: f64) -> Result<GradeOutcome> {
    check_range("attendance", attendance)?;
    check_range("midterm", midterm)?;
    check_range("final", final_exam)?;

    let process_score = round1(0.3 * attendance + 0.7 * midterm);
    let total_score = round1(0.3 * process_score + 0.7 * final_exam);

    Ok(GradeOutcome {
        process_score,
        total_score,
        letter_grade: LetterGrade::from_total(total_score),
        passed: final_exam >= 2.0 && total_score >= 4.0,
    })
}

/// Cumulative grade point average over a student's score history.
///
/// Failed subjects count toward `total_subjects` and `total_failed_subjects`
/// but contribute neither grade points nor credits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CgpaSummary {
    /// Credit-weighted average on the 4.0 scale, one decimal place
    pub cgpa: f64,
    pub total_subjects: u32,
    /// Credits of passed subjects only
    pub total_credits: u32,
    pub total_failed_subjects: u32,
}

impl CgpaSummary {
    pub fn empty() -> Self {
        Self {
            cgpa: 0.0,
            total_subjects: 0,
            total_credits: 0,
            total_failed_subjects: 0,
        }
    }

    /// Fold (letter, credit, passed) triples into a summary.
    pub fn aggregate(records: impl IntoIterator<Item = (LetterGrade, u32, bool)>) -> Self {
        let mut weighted = 0.0;
        let mut credits: u32 = 0;
        let mut subjects: u32 = 0;
        let mut failed: u32 = 0;

        for (letter, credit, passed) in records {
            subjects += 1;
            if passed {
                weighted += letter.grade_points() * f64::from(credit);
                credits += credit;
            } else {
                failed += 1;
            }
        }

        let cgpa = if credits > 0 {
            round1(weighted / f64::from(credits))
        } else {
            0.0
        };

        Self {
            cgpa,
            total_subjects: subjects,
            total_credits: credits,
            total_failed_subjects: failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_weighted_scores() {
        let outcome = grade(8.0, 7.0, 6.0).unwrap();
        assert_eq!(outcome.process_score, 7.3);
        assert_eq!(outcome.total_score, 6.4);
        // 6.3 <= 6.4 < 7.0 lands in the C+ bucket
        assert_eq!(outcome.letter_grade, LetterGrade::CPlus);
        assert!(outcome.passed);
    }

    #[test]
    fn perfect_scores_stay_in_range() {
        let outcome = grade(10.0, 10.0, 10.0).unwrap();
        assert_eq!(outcome.process_score, 10.0);
        assert_eq!(outcome.total_score, 10.0);
        assert_eq!(outcome.letter_grade, LetterGrade::APlus);
    }

    #[test]
    fn rejects_out_of_range_inputs() {
        assert!(matches!(
            grade(-0.1, 5.0, 5.0),
            Err(EngineError::Validation { field: "attendance", .. })
        ));
        assert!(matches!(
            grade(5.0, 10.1, 5.0),
            Err(EngineError::Validation { field: "midterm", .. })
        ));
        assert!(matches!(
            grade(5.0, 5.0, f64::NAN),
            Err(EngineError::Validation { field: "final", .. })
        ));
    }

    #[test]
    fn failing_final_fails_despite_total() {
        // High attendance/midterm, final exam below the 2.0 floor
        let outcome = grade(10.0, 10.0, 1.9).unwrap();
        assert!(outcome.total_score >= 4.0);
        assert!(!outcome.passed);
    }

    #[test]
    fn letter_boundaries() {
        assert_eq!(LetterGrade::from_total(9.0), LetterGrade::APlus);
        assert_eq!(LetterGrade::from_total(8.9), LetterGrade::A);
        assert_eq!(LetterGrade::from_total(8.5), LetterGrade::A);
        assert_eq!(LetterGrade::from_total(7.8), LetterGrade::BPlus);
        assert_eq!(LetterGrade::from_total(7.0), LetterGrade::B);
        assert_eq!(LetterGrade::from_total(6.3), LetterGrade::CPlus);
        assert_eq!(LetterGrade::from_total(5.5), LetterGrade::C);
        assert_eq!(LetterGrade::from_total(4.8), LetterGrade::DPlus);
        assert_eq!(LetterGrade::from_total(4.0), LetterGrade::D);
        assert_eq!(LetterGrade::from_total(3.9), LetterGrade::F);
        assert_eq!(LetterGrade::from_total(0.0), LetterGrade::F);
    }

    #[test]
    fn letter_round_trips_through_str() {
        for letter in [
            LetterGrade::APlus,
            LetterGrade::A,
            LetterGrade::BPlus,
            LetterGrade::B,
            LetterGrade::CPlus,
            LetterGrade::C,
            LetterGrade::DPlus,
            LetterGrade::D,
            LetterGrade::F,
        ] {
            assert_eq!(LetterGrade::parse(letter.as_str()), Some(letter));
        }
        assert_eq!(LetterGrade::parse("E"), None);
    }

    #[test]
    fn cgpa_excludes_failed_subjects() {
        let summary = CgpaSummary::aggregate([
            (LetterGrade::A, 3, true),
            (LetterGrade::F, 3, false),
        ]);
        assert_eq!(summary.cgpa, 3.8);
        assert_eq!(summary.total_subjects, 2);
        assert_eq!(summary.total_credits, 3);
        assert_eq!(summary.total_failed_subjects, 1);
    }

    #[test]
    fn cgpa_of_all_a_plus_is_four() {
        let summary = CgpaSummary::aggregate([
            (LetterGrade::APlus, 3, true),
            (LetterGrade::F, 3, false),
        ]);
        assert_eq!(summary.cgpa, 4.0);
    }

    #[test]
    fn cgpa_is_credit_weighted() {
        // (4.0 * 4 + 2.0 * 1) / 5 = 3.6
        let summary = CgpaSummary::aggregate([
            (LetterGrade::APlus, 4, true),
            (LetterGrade::C, 1, true),
        ]);
        assert_eq!(summary.cgpa, 3.6);
        assert_eq!(summary.total_credits, 5);
    }

    #[test]
    fn cgpa_of_empty_history_is_zero() {
        let summary = CgpaSummary::aggregate([]);
        assert_eq!(summary, CgpaSummary::empty());
    }

    #[test]
    fn all_failed_yields_zero_cgpa() {
        let summary = CgpaSummary::aggregate([
            (LetterGrade::F, 3, false),
            (LetterGrade::F, 2, false),
        ]);
        assert_eq!(summary.cgpa, 0.0);
        assert_eq!(summary.total_credits, 0);
        assert_eq!(summary.total_failed_subjects, 2);
    }
}

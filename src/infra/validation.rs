//! Declarative request validation.
//!
//! Every request type declares its field rules in one place; the API layer
//! runs them once before a request enters the core. Rules are data, not
//! ad hoc per-handler checks.

use crate::infra::{EngineError, Result};

/// A single named field rule
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub rule: Rule,
}

/// Rule kinds the schema can express
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Numeric value must lie within the inclusive range
    Range { min: f64, max: f64 },
    /// String must be non-empty after trimming
    Required,
    /// String must not exceed the given length
    MaxLen(usize),
    /// Integer must be strictly positive
    Positive,
}

/// A value checked against a rule
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
    Integer(i64),
    /// Absent optional field; rules are skipped
    Missing,
}

/// Declared validation schema for one request type
pub trait Validate {
    /// The rule set, paired with the current field values
    fn rules(&self) -> Vec<(FieldRule, FieldValue<'_>)>;

    /// Run every rule; the first violation wins
    fn validate(&self) -> Result<()> {
        for (rule, value) in self.rules() {
            check(rule, value)?;
        }
        Ok(())
    }
}

fn check(rule: FieldRule, value: FieldValue<'_>) -> Result<()> {
    let violation = |message: String| EngineError::Validation {
        field: rule.field,
        message,
    };

    match (rule.rule, value) {
        (_, FieldValue::Missing) => Ok(()),
        (Rule::Range { min, max }, FieldValue::Number(n)) => {
            if !n.is_finite() || n < min || n > max {
                Err(violation(format!("must be within [{min}, {max}], got {n}")))
            } else {
                Ok(())
            }
        }
        (Rule::Required, FieldValue::Text(s)) => {
            if s.trim().is_empty() {
                Err(violation("is required".to_string()))
            } else {
                Ok(())
            }
        }
        (Rule::MaxLen(max), FieldValue::Text(s)) => {
            if s.len() > max {
                Err(violation(format!("must be at most {max} characters")))
            } else {
                Ok(())
            }
        }
        (Rule::Positive, FieldValue::Integer(n)) => {
            if n <= 0 {
                Err(violation(format!("must be positive, got {n}")))
            } else {
                Ok(())
            }
        }
        // Mismatched rule/value pairings are a programming error in the
        // schema declaration; treat as a violation rather than panic.
        (rule, value) => Err(violation(format!(
            "rule {rule:?} cannot apply to value {value:?}"
        ))),
    }
}

/// Convenience for score sub-fields, all constrained to [0, 10]
pub fn score_rule(field: &'static str) -> FieldRule {
    FieldRule {
        field,
        rule: Rule::Range {
            min: 0.0,
            max: 10.0,
        },
    }
}

/// Convenience for required string fields
pub fn required(field: &'static str) -> FieldRule {
    FieldRule {
        field,
        rule: Rule::Required,
    }
}

/// Convenience for bounded string fields
pub fn max_len(field: &'static str, max: usize) -> FieldRule {
    FieldRule {
        field,
        rule: Rule::MaxLen(max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample<'a> {
        attendance: f64,
        serial: &'a str,
        note: Option<&'a str>,
    }

    impl Validate for Sample<'_> {
        fn rules(&self) -> Vec<(FieldRule, FieldValue<'_>)> {
            vec![
                (score_rule("attendance"), FieldValue::Number(self.attendance)),
                (required("serial"), FieldValue::Text(self.serial)),
                (
                    max_len("note", 8),
                    self.note.map_or(FieldValue::Missing, FieldValue::Text),
                ),
            ]
        }
    }

    #[test]
    fn passes_when_all_rules_hold() {
        let sample = Sample {
            attendance: 7.5,
            serial: "SN-1",
            note: None,
        };
        assert!(sample.validate().is_ok());
    }

    #[test]
    fn range_violation_names_the_field() {
        let sample = Sample {
            attendance: 10.5,
            serial: "SN-1",
            note: None,
        };
        let err = sample.validate().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation { field: "attendance", .. }
        ));
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let sample = Sample {
            attendance: 5.0,
            serial: "   ",
            note: None,
        };
        assert!(sample.validate().is_err());
    }

    #[test]
    fn missing_optional_field_skips_rules() {
        let long = "far-too-long-note";
        let with_note = Sample {
            attendance: 5.0,
            serial: "SN-1",
            note: Some(long),
        };
        assert!(with_note.validate().is_err());

        let without = Sample {
            attendance: 5.0,
            serial: "SN-1",
            note: None,
        };
        assert!(without.validate().is_ok());
    }
}

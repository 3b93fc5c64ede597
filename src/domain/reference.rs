//! Reference data consulted by the orchestrators: students, subjects,
//! faculties and universities. The engine reads these through directory
//! collaborators and never mutates them.

use serde::{Deserialize, Serialize};

use super::types::{FacultyId, StudentId, SubjectId, UniversityId};

/// Student directory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub student_code: String,
    pub full_name: String,
    /// Absent until the student has been assigned to a faculty
    pub faculty_id: Option<FacultyId>,
    pub university_id: UniversityId,
}

/// Subject (course) reference data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub code: String,
    pub name: String,
    /// Positive credit weight used by the CGPA aggregation
    pub credit: u32,
    pub faculty_id: FacultyId,
}

/// Faculty reference data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faculty {
    pub id: FacultyId,
    pub code: String,
    pub name: String,
    pub university_id: UniversityId,
}

/// University reference data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct University {
    pub id: UniversityId,
    pub code: String,
    pub name: String,
}

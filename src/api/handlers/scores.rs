//! Score and CGPA handlers.

use axum::extract::{Extension, Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{CreateScoreRequest, ImportScoresRequest, UpdateScoreRequest};
use crate::auth::AuthContextExt;
use crate::domain::{ScoreId, ScorePatch, ScoreRecord, StudentId, SubjectId};
use crate::infra::validation::Validate;
use crate::server::AppState;
use crate::service::{ImportOutcome, ImportScoreRow, ScoreView};

/// POST /v1/scores - Record one score
pub async fn create_score(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Json(request): Json<CreateScoreRequest>,
) -> Result<Json<ScoreRecord>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;
    request.validate()?;

    let record = state
        .scores
        .create(
            StudentId::from_uuid(request.student_id),
            SubjectId::from_uuid(request.subject_id),
            &request.semester,
            request.input(),
        )
        .await?;
    Ok(Json(record))
}

/// PATCH /v1/scores/:id - Patch raw sub-scores; derived fields recompute
pub async fn update_score(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateScoreRequest>,
) -> Result<Json<ScoreRecord>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;
    request.validate()?;

    let record = state
        .scores
        .update(
            ScoreId::from_uuid(id),
            ScorePatch {
                attendance: request.attendance,
                midterm: request.midterm,
                final_exam: request.final_exam,
            },
        )
        .await?;
    Ok(Json(record))
}

/// POST /v1/scores/import - Batch import for one subject
pub async fn import_scores(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Json(request): Json<ImportScoresRequest>,
) -> Result<Json<Vec<ImportOutcome>>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;
    request.validate()?;
    let university_id = auth.university().map_err(forbidden)?;

    let rows = request
        .rows
        .into_iter()
        .map(|row| ImportScoreRow {
            student_code: row.student_code,
            semester: row.semester,
            input: crate::domain::ScoreInput {
                attendance: row.attendance,
                midterm: row.midterm,
                final_exam: row.final_exam,
            },
        })
        .collect();

    let outcomes = state
        .scores
        .import(university_id, &request.subject_code, rows)
        .await?;
    Ok(Json(outcomes))
}

/// GET /v1/students/:id/scores - Scores joined with subject data
pub async fn student_scores(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<ScoreView>>, ApiError> {
    let views = state
        .scores
        .scores_for_student(StudentId::from_uuid(student_id))
        .await?;
    Ok(Json(views))
}

/// GET /v1/subjects/:id/scores - Scores joined with student names
pub async fn subject_scores(
    State(state): State<AppState>,
    Path(subject_id): Path<Uuid>,
) -> Result<Json<Vec<ScoreView>>, ApiError> {
    let views = state
        .scores
        .scores_for_subject(SubjectId::from_uuid(subject_id))
        .await?;
    Ok(Json(views))
}

/// GET /v1/students/:id/cgpa - Cumulative GPA summary
pub async fn student_cgpa(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<crate::domain::CgpaSummary>, ApiError> {
    let summary = state.scores.cgpa(StudentId::from_uuid(student_id)).await?;
    Ok(Json(summary))
}

pub(super) fn forbidden(err: crate::auth::AuthError) -> ApiError {
    ApiError::new(
        crate::api::error::ErrorCode::InsufficientPermissions,
        err.to_string(),
    )
}

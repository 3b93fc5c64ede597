//! Verification code handlers.
//!
//! Code creation and listing require an authenticated owner; the scoped
//! views are public, authenticated by the code itself.

use axum::extract::{Extension, Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{CertificateResponse, CreateCodeRequest};
use crate::auth::AuthContextExt;
use crate::domain::{Capability, StudentId, VerificationCode};
use crate::infra::validation::Validate;
use crate::server::AppState;
use crate::service::{CodeView, ScoreView};

/// POST /v1/verification-codes - Issue a code for the caller's own record
pub async fn create_code(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Json(request): Json<CreateCodeRequest>,
) -> Result<Json<VerificationCode>, ApiError> {
    request.validate()?;

    let owner_id = StudentId::from_uuid(auth.subject);
    let code = state
        .verification
        .create(
            owner_id,
            &request.capabilities,
            request.ttl_minutes,
            request.notify_destination,
        )
        .await?;
    Ok(Json(code))
}

/// GET /v1/verification-codes - The caller's codes with remaining time
pub async fn list_codes(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
) -> Result<Json<Vec<CodeView>>, ApiError> {
    let owner_id = StudentId::from_uuid(auth.subject);
    let views = state.verification.list(owner_id).await?;
    Ok(Json(views))
}

/// GET /verify/:code/scores - Scoped view of the owner's score table
pub async fn view_scores(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<ScoreView>>, ApiError> {
    let grant = state
        .verification
        .redeem(&code, Capability::ViewScore)
        .await?;
    let views = state.scores.scores_for_student(grant.owner_id).await?;
    Ok(Json(views))
}

/// GET /verify/:code/data - Scoped view of the owner's certificates
pub async fn view_data(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<CertificateResponse>>, ApiError> {
    let grant = state
        .verification
        .redeem(&code, Capability::ViewData)
        .await?;
    let certificates = state.certificates.list_by_student(grant.owner_id).await?;
    Ok(Json(certificates.into_iter().map(Into::into).collect()))
}

/// GET /verify/:code/file - The owner's latest certificate file
pub async fn view_file(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<axum::response::Response, ApiError> {
    let grant = state
        .verification
        .redeem(&code, Capability::ViewFile)
        .await?;

    let certificates = state.certificates.list_by_student(grant.owner_id).await?;
    let with_file = certificates
        .into_iter()
        .find(|c| c.file_path.is_some())
        .ok_or_else(|| {
            ApiError::new(
                crate::api::error::ErrorCode::ResourceNotFound,
                "no certificate file on record",
            )
        })?;

    let bytes = state.certificates.fetch_file(with_file.id).await?;
    Ok(axum::response::IntoResponse::into_response((
        [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )))
}

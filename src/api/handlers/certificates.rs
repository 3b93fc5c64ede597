//! Certificate lifecycle handlers.

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{
    CertificateResponse, CreateCertificateRequest, SearchCertificatesQuery,
    SearchCertificatesResponse, UploadFileQuery,
};
use crate::auth::AuthContextExt;
use crate::domain::{CertificateId, FacultyId};
use crate::infra::validation::Validate;
use crate::infra::CertificateFilter;
use crate::server::AppState;
use crate::service::{LedgerVerification, NewCertificateRequest};

use super::scores::forbidden;

/// POST /v1/certificates - Create a certificate in Draft
pub async fn create_certificate(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Json(request): Json<CreateCertificateRequest>,
) -> Result<Json<CertificateResponse>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;
    request.validate()?;
    let university_id = auth.university().map_err(forbidden)?;

    let certificate = state
        .certificates
        .create(
            university_id,
            NewCertificateRequest {
                student_code: request.student_code,
                kind: request.kind,
                name: request.name,
                serial_number: request.serial_number,
                registration_number: request.registration_number,
                issue_date: request.issue_date,
            },
        )
        .await?;
    Ok(Json(certificate.into()))
}

/// GET /v1/certificates/:id
pub async fn get_certificate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CertificateResponse>, ApiError> {
    let certificate = state
        .certificates
        .get(CertificateId::from_uuid(id))
        .await?;
    Ok(Json(certificate.into()))
}

/// GET /v1/certificates - Search within the caller's university
pub async fn search_certificates(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Query(query): Query<SearchCertificatesQuery>,
) -> Result<Json<SearchCertificatesResponse>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;
    let university_id = auth.university().map_err(forbidden)?;

    let filter = CertificateFilter {
        student_code: query.student_code,
        kind: query.kind,
        status: query.status,
        faculty_id: query.faculty_id.map(FacultyId::from_uuid),
        page: query.page,
        page_size: query.page_size,
    };

    let (certificates, total) = state.certificates.search(university_id, &filter).await?;
    Ok(Json(SearchCertificatesResponse {
        certificates: certificates.into_iter().map(Into::into).collect(),
        total,
        page: filter.page,
        page_size: filter.page_size,
    }))
}

/// POST /v1/certificates/:id/hash - Compute and record the canonical digest
pub async fn hash_certificate(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
) -> Result<Json<CertificateResponse>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;
    let certificate = state.certificates.hash(CertificateId::from_uuid(id)).await?;
    Ok(Json(certificate.into()))
}

/// POST /v1/certificates/:id/sign - Sign the recorded digest
pub async fn sign_certificate(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
) -> Result<Json<CertificateResponse>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;
    let certificate = state.certificates.sign(CertificateId::from_uuid(id)).await?;
    Ok(Json(certificate.into()))
}

/// POST /v1/certificates/:id/anchor - Anchor the digest on the ledger
pub async fn anchor_certificate(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
) -> Result<Json<CertificateResponse>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;
    let certificate = state
        .certificates
        .anchor(CertificateId::from_uuid(id))
        .await?;
    Ok(Json(certificate.into()))
}

/// POST /v1/certificates/:id/revoke - Irreversibly revoke
pub async fn revoke_certificate(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
) -> Result<Json<CertificateResponse>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;
    let certificate = state
        .certificates
        .revoke(CertificateId::from_uuid(id))
        .await?;
    Ok(Json(certificate.into()))
}

/// POST /v1/certificates/:id/file?filename=... - Upload the certificate file
pub async fn upload_certificate_file(
    State(state): State<AppState>,
    Extension(AuthContextExt(auth)): Extension<AuthContextExt>,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadFileQuery>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    auth.require_registrar().map_err(forbidden)?;

    let object_key = state
        .certificates
        .upload_file(CertificateId::from_uuid(id), &query.filename, &body)
        .await?;
    Ok(Json(serde_json::json!({ "file_path": object_key })))
}

/// GET /v1/certificates/:id/ledger - Compare stored hash with the ledger
pub async fn verify_certificate_ledger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LedgerVerification>, ApiError> {
    let verification = state
        .certificates
        .verify_against_ledger(CertificateId::from_uuid(id))
        .await?;
    Ok(Json(verification))
}

//! REST API routers.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::server::AppState;

use super::handlers::{certificates, scores, verification};

/// Build the authenticated `/api` router
pub fn router() -> Router<AppState> {
    Router::new()
        // Scores
        .route("/v1/scores", post(scores::create_score))
        .route("/v1/scores/import", post(scores::import_scores))
        .route("/v1/scores/:id", patch(scores::update_score))
        .route("/v1/students/:id/scores", get(scores::student_scores))
        .route("/v1/students/:id/cgpa", get(scores::student_cgpa))
        .route("/v1/subjects/:id/scores", get(scores::subject_scores))
        // Certificates
        .route("/v1/certificates", post(certificates::create_certificate))
        .route("/v1/certificates", get(certificates::search_certificates))
        .route("/v1/certificates/:id", get(certificates::get_certificate))
        .route("/v1/certificates/:id/hash", post(certificates::hash_certificate))
        .route("/v1/certificates/:id/sign", post(certificates::sign_certificate))
        .route(
            "/v1/certificates/:id/anchor",
            post(certificates::anchor_certificate),
        )
        .route(
            "/v1/certificates/:id/revoke",
            post(certificates::revoke_certificate),
        )
        .route(
            "/v1/certificates/:id/file",
            post(certificates::upload_certificate_file),
        )
        .route(
            "/v1/certificates/:id/ledger",
            get(certificates::verify_certificate_ledger),
        )
        // Verification codes (owner side)
        .route("/v1/verification-codes", post(verification::create_code))
        .route("/v1/verification-codes", get(verification::list_codes))
}

/// Build the public router: scoped views authenticated by the code itself
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/verify/:code/scores", get(verification::view_scores))
        .route("/verify/:code/data", get(verification::view_data))
        .route("/verify/:code/file", get(verification::view_file))
}

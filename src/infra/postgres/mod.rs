//! PostgreSQL implementations of the repository collaborators.
//!
//! All uniqueness invariants are enforced by constraints and unique indexes,
//! so concurrent inserts are arbitrated by the database, not by in-process
//! checks. Storage errors never cross this boundary raw: unique violations
//! become the matching conflict variant, missing rows become `NotFound`, and
//! everything else becomes a tagged `External` error.

mod certificates;
mod directory;
mod scores;
mod verification;

pub use certificates::PgCertificateRepository;
pub use directory::{PgInstitutionDirectory, PgStudentDirectory, PgSubjectCatalog};
pub use scores::PgScoreRepository;
pub use verification::PgVerificationCodeRepository;

use crate::infra::EngineError;

/// Wrap a non-conflict sqlx error with operation context.
///
/// Connection/pool troubles are retryable; anything else (malformed
/// statement, decode failure) is terminal.
pub(crate) fn external_db(operation: &'static str, err: sqlx::Error) -> EngineError {
    let retryable = matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    );
    EngineError::external(operation, retryable, err.to_string())
}

/// The violated unique constraint's name, if this is a unique violation
pub(crate) fn unique_constraint(err: &sqlx::Error) -> Option<String> {
    if let sqlx::Error::Database(db) = err {
        if db.is_unique_violation() {
            return db.constraint().map(str::to_owned);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_retryable() {
        let err = external_db("insert score", sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
    }

    #[test]
    fn decode_errors_are_terminal() {
        let err = external_db(
            "decode row",
            sqlx::Error::Decode("bad letter grade".into()),
        );
        assert!(!err.is_retryable());
    }
}

//! Orchestrators composing the domain core with its collaborators.
//!
//! Each service takes the collaborator interfaces it needs through its
//! constructor; there is no process-wide shared handle anywhere.

mod certificates;
mod scores;
mod verification;

pub use certificates::{CertificateService, LedgerVerification, NewCertificateRequest};
pub use scores::{ImportOutcome, ImportScoreRow, ImportStatus, ScoreService, ScoreView};
pub use verification::{CodeView, VerificationGrant, VerificationService};

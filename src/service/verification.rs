//! Verification code issuance, listing and redemption.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Capability, StudentId, VerificationCode};
use crate::infra::{EngineError, Notifier, Result, VerificationCodeRepository};

/// A code as presented to its owner, with live remaining time
#[derive(Debug, Clone, Serialize)]
pub struct CodeView {
    pub code: String,
    pub can_view_score: bool,
    pub can_view_data: bool,
    pub can_view_file: bool,
    pub viewed_score: bool,
    pub viewed_data: bool,
    pub viewed_file: bool,
    pub remaining_minutes: i64,
    pub created_at: chrono::DateTime<Utc>,
}

/// Successful redemption: the owner whose record may now be read
#[derive(Debug, Clone, Copy)]
pub struct VerificationGrant {
    pub owner_id: StudentId,
    pub capability: Capability,
}

/// Issues and redeems capability-scoped verification codes
pub struct VerificationService {
    codes: Arc<dyn VerificationCodeRepository>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl VerificationService {
    pub fn new(
        codes: Arc<dyn VerificationCodeRepository>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self { codes, notifier }
    }

    /// Issue a code for the record owner. A zero TTL produces an immediately
    /// expired code, which is a valid edge case. When a destination is given
    /// and a notifier is configured, delivery is fire-and-forget.
    pub async fn create(
        &self,
        owner_id: StudentId,
        capabilities: &[Capability],
        ttl_minutes: i64,
        notify_destination: Option<String>,
    ) -> Result<VerificationCode> {
        if ttl_minutes < 0 {
            return Err(EngineError::Validation {
                field: "ttl_minutes",
                message: format!("must be non-negative, got {ttl_minutes}"),
            });
        }
        if capabilities.is_empty() {
            return Err(EngineError::Validation {
                field: "capabilities",
                message: "at least one capability is required".to_string(),
            });
        }

        let code = VerificationCode::issue(owner_id, capabilities, ttl_minutes);
        self.codes.insert(&code).await?;
        info!(owner_id = %owner_id, ttl_minutes, "verification code issued");

        if let (Some(notifier), Some(destination)) = (&self.notifier, notify_destination) {
            let notifier = notifier.clone();
            let message = format!("Your verification code is {}", code.code);
            tokio::spawn(async move {
                if let Err(e) = notifier.send(&destination, &message).await {
                    warn!(error = %e, "verification code notification failed");
                }
            });
        }

        Ok(code)
    }

    /// All of the owner's codes with remaining minutes computed against the
    /// current clock (clamped at zero once expired)
    pub async fn list(&self, owner_id: StudentId) -> Result<Vec<CodeView>> {
        let now = Utc::now();
        let codes = self.codes.list_by_owner(owner_id).await?;

        Ok(codes
            .into_iter()
            .map(|code| CodeView {
                remaining_minutes: code.remaining_minutes_at(now),
                can_view_score: code.can_view_score,
                can_view_data: code.can_view_data,
                can_view_file: code.can_view_file,
                viewed_score: code.viewed_score,
                viewed_data: code.viewed_data,
                viewed_file: code.viewed_file,
                created_at: code.created_at,
                code: code.code,
            })
            .collect())
    }

    /// Redeem a code for one capability.
    ///
    /// Capability denial wins over expiry; a successful redemption marks the
    /// capability's viewed flag (audit trail, not single-use) and names the
    /// owner whose record may be read.
    pub async fn redeem(
        &self,
        code_str: &str,
        capability: Capability,
    ) -> Result<VerificationGrant> {
        let mut code = self
            .codes
            .find_by_code(code_str)
            .await?
            .ok_or_else(|| EngineError::not_found("verification code", code_str))?;

        code.redeem(capability)?;
        self.codes.mark_viewed(code.id, capability).await?;

        info!(owner_id = %code.owner_id, %capability, "verification code redeemed");
        Ok(VerificationGrant {
            owner_id: code.owner_id,
            capability,
        })
    }
}

//! Time-limited, capability-scoped verification codes.
//!
//! A code grants third parties read access to a slice of the owner's record.
//! Redemption is audit-tracked (viewed flags), not single-use: a capability
//! can be viewed again while the code is live.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::types::{StudentId, VerificationCodeId};
use crate::infra::{EngineError, Result};

/// Length of the opaque code string
const CODE_LEN: usize = 16;

/// What a verification code can be redeemed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewScore,
    ViewData,
    ViewFile,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewScore => "view_score",
            Capability::ViewData => "view_data",
            Capability::ViewFile => "view_file",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An issued verification code with its capability set and audit flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCode {
    pub id: VerificationCodeId,
    pub owner_id: StudentId,
    pub code: String,

    pub can_view_score: bool,
    pub can_view_data: bool,
    pub can_view_file: bool,

    pub viewed_score: bool,
    pub viewed_data: bool,
    pub viewed_file: bool,

    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Generate a high-entropy opaque code string
fn generate_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(char::from)
        .collect()
}

impl VerificationCode {
    /// Issue a code for `owner_id` with the given capability set.
    ///
    /// `ttl_minutes = 0` yields an immediately expired code; that is a valid
    /// edge case, not an error.
    pub fn issue(
        owner_id: StudentId,
        capabilities: &[Capability],
        ttl_minutes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: VerificationCodeId::new(),
            owner_id,
            code: generate_code(),
            can_view_score: capabilities.contains(&Capability::ViewScore),
            can_view_data: capabilities.contains(&Capability::ViewData),
            can_view_file: capabilities.contains(&Capability::ViewFile),
            viewed_score: false,
            viewed_data: false,
            viewed_file: false,
            expires_at: now + Duration::minutes(ttl_minutes),
            created_at: now,
        }
    }

    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewScore => self.can_view_score,
            Capability::ViewData => self.can_view_data,
            Capability::ViewFile => self.can_view_file,
        }
    }

    pub fn viewed(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewScore => self.viewed_score,
            Capability::ViewData => self.viewed_data,
            Capability::ViewFile => self.viewed_file,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whole minutes until expiry, clamped at zero
    pub fn remaining_minutes_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_minutes().max(0)
    }

    /// Check a redemption attempt against the capability set and expiry.
    ///
    /// The capability check comes first: asking for a capability the code
    /// never carried reports `CapabilityDenied` even if the code has also
    /// expired. On success the matching viewed flag is set.
    pub fn redeem_at(&mut self, capability: Capability, now: DateTime<Utc>) -> Result<()> {
        if !self.grants(capability) {
            return Err(EngineError::CapabilityDenied { capability });
        }
        if self.is_expired_at(now) {
            return Err(EngineError::Expired {
                code: self.code.clone(),
            });
        }
        match capability {
            Capability::ViewScore => self.viewed_score = true,
            Capability::ViewData => self.viewed_data = true,
            Capability::ViewFile => self.viewed_file = true,
        }
        Ok(())
    }

    /// Redeem against the current clock.
    pub fn redeem(&mut self, capability: Capability) -> Result<()> {
        self.redeem_at(capability, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(capabilities: &[Capability], ttl_minutes: i64) -> VerificationCode {
        VerificationCode::issue(StudentId::new(), capabilities, ttl_minutes)
    }

    #[test]
    fn codes_are_opaque_and_distinct() {
        let a = code(&[Capability::ViewScore], 10);
        let b = code(&[Capability::ViewScore], 10);
        assert_eq!(a.code.len(), CODE_LEN);
        assert_ne!(a.code, b.code);
    }

    #[test]
    fn zero_ttl_is_immediately_expired() {
        let mut c = code(&[Capability::ViewScore], 0);
        let later = c.created_at + Duration::seconds(1);
        assert_eq!(c.remaining_minutes_at(later), 0);
        assert!(matches!(
            c.redeem_at(Capability::ViewScore, later),
            Err(EngineError::Expired { .. })
        ));
    }

    #[test]
    fn redeem_marks_only_the_requested_flag() {
        let mut c = code(&[Capability::ViewScore, Capability::ViewData], 30);
        c.redeem(Capability::ViewScore).unwrap();
        assert!(c.viewed_score);
        assert!(!c.viewed_data);
        assert!(!c.viewed_file);
    }

    #[test]
    fn redeem_is_not_single_use() {
        let mut c = code(&[Capability::ViewData], 30);
        c.redeem(Capability::ViewData).unwrap();
        // audit-only tracking: a second view is still allowed
        c.redeem(Capability::ViewData).unwrap();
        assert!(c.viewed_data);
    }

    #[test]
    fn missing_capability_is_denied_even_when_expired() {
        let mut c = code(&[Capability::ViewScore], 0);
        let later = c.created_at + Duration::minutes(5);
        assert!(c.is_expired_at(later));
        assert!(matches!(
            c.redeem_at(Capability::ViewFile, later),
            Err(EngineError::CapabilityDenied {
                capability: Capability::ViewFile
            })
        ));
    }

    #[test]
    fn remaining_minutes_rounds_down() {
        let c = code(&[Capability::ViewScore], 10);
        let now = c.created_at + Duration::seconds(30);
        assert_eq!(c.remaining_minutes_at(now), 9);
    }
}

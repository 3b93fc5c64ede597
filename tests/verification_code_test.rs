//! Verification code behavior: expiry, capability gating, audit flags.

mod common;

use chrono::Duration;
use credentis::domain::{Capability, VerificationCode};
use credentis::EngineError;

use common::test_student_id;

#[test]
fn zero_ttl_code_reports_zero_remaining_and_expired() {
    let code = VerificationCode::issue(test_student_id(), &[Capability::ViewScore], 0);
    let later = code.created_at + Duration::seconds(30);

    assert_eq!(code.remaining_minutes_at(later), 0);
    assert!(code.is_expired_at(later));
}

#[test]
fn redeeming_expired_code_fails() {
    let mut code = VerificationCode::issue(test_student_id(), &[Capability::ViewScore], 0);
    let later = code.created_at + Duration::seconds(1);

    let err = code.redeem_at(Capability::ViewScore, later).unwrap_err();
    assert!(matches!(err, EngineError::Expired { .. }));
    assert!(!code.viewed_score, "failed redemption must not mark the flag");
}

#[test]
fn capability_denial_beats_expiry() {
    let mut code = VerificationCode::issue(test_student_id(), &[Capability::ViewScore], 0);
    let later = code.created_at + Duration::minutes(10);

    let err = code.redeem_at(Capability::ViewFile, later).unwrap_err();
    assert!(matches!(
        err,
        EngineError::CapabilityDenied { capability: Capability::ViewFile }
    ));
}

#[test]
fn redemption_is_audited_but_not_single_use() {
    let mut code = VerificationCode::issue(
        test_student_id(),
        &[Capability::ViewScore, Capability::ViewData],
        60,
    );
    let now = code.created_at + Duration::minutes(1);

    code.redeem_at(Capability::ViewScore, now).unwrap();
    assert!(code.viewed_score);
    assert!(!code.viewed_data);

    // a second view of the same capability is permitted
    code.redeem_at(Capability::ViewScore, now + Duration::minutes(1))
        .unwrap();

    code.redeem_at(Capability::ViewData, now).unwrap();
    assert!(code.viewed_data);
}

#[test]
fn remaining_minutes_count_down_in_whole_minutes() {
    let code = VerificationCode::issue(test_student_id(), &[Capability::ViewData], 30);

    assert_eq!(code.remaining_minutes_at(code.created_at), 30);
    assert_eq!(
        code.remaining_minutes_at(code.created_at + Duration::seconds(90)),
        28
    );
    assert_eq!(
        code.remaining_minutes_at(code.created_at + Duration::minutes(31)),
        0
    );
}

#[test]
fn issued_codes_are_high_entropy() {
    let codes: Vec<String> = (0..32)
        .map(|_| {
            VerificationCode::issue(test_student_id(), &[Capability::ViewScore], 5).code
        })
        .collect();

    for code in &codes {
        assert_eq!(code.len(), 16);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    let mut unique = codes.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), codes.len());
}

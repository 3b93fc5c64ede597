//! Certificate lifecycle integration tests over the domain entity and the
//! canonical digest.

mod common;

use chrono::Utc;
use credentis::crypto::{certificate_digest, CertificateSigner};
use credentis::domain::{CertificateStatus, LedgerAnchor};
use credentis::EngineError;

use common::draft_certificate;

fn anchor_for(digest: [u8; 32]) -> LedgerAnchor {
    LedgerAnchor {
        tx_id: "tx-0001".into(),
        digest,
        anchored_at: Utc::now(),
    }
}

#[test]
fn full_lifecycle_with_real_crypto() {
    let signer = CertificateSigner::generate();
    let mut cert = draft_certificate();

    // hash
    let digest = certificate_digest(&cert.hash_input());
    cert.record_hash(digest).unwrap();
    assert_eq!(cert.status, CertificateStatus::Hashed);

    // sign
    let signature = signer.sign(&digest);
    cert.attach_signature(signature.to_vec(), signer.identity())
        .unwrap();
    assert_eq!(cert.status, CertificateStatus::Signed);

    // the signature verifies against the recorded digest
    signer
        .verifying_key()
        .verify(&cert.hash.unwrap(), cert.signature.as_deref().unwrap())
        .unwrap();

    // anchor
    cert.record_anchor(anchor_for(digest)).unwrap();
    assert_eq!(cert.status, CertificateStatus::Anchored);
    assert_eq!(cert.anchor.as_ref().unwrap().digest, digest);

    // revocation remains available after anchoring
    cert.revoke().unwrap();
    assert_eq!(cert.status, CertificateStatus::Revoked);
}

#[test]
fn digest_is_stable_across_lifecycle_mutations() {
    let mut cert = draft_certificate();

    let before = certificate_digest(&cert.hash_input());
    let again = certificate_digest(&cert.hash_input());
    assert_eq!(before, again, "unchanged draft must hash identically");

    cert.record_hash(before).unwrap();
    let signer = CertificateSigner::generate();
    let signature = signer.sign(&before);
    cert.attach_signature(signature.to_vec(), signer.identity())
        .unwrap();
    cert.record_anchor(anchor_for(before)).unwrap();

    // status, signature and ledger metadata never reach the digest
    assert_eq!(certificate_digest(&cert.hash_input()), before);
}

#[test]
fn digest_differs_between_certificates() {
    let a = draft_certificate();
    let mut b = draft_certificate();
    b.registration_number = "REG-2024-0002".into();

    assert_ne!(
        certificate_digest(&a.hash_input()),
        certificate_digest(&b.hash_input())
    );
}

#[test]
fn out_of_order_transitions_are_state_errors() {
    let signer = CertificateSigner::generate();

    // sign before hash
    let mut cert = draft_certificate();
    let err = cert
        .attach_signature(vec![0u8; 64], signer.identity())
        .unwrap_err();
    assert!(matches!(err, EngineError::State { operation: "sign", .. }));

    // anchor before sign
    let mut cert = draft_certificate();
    let digest = certificate_digest(&cert.hash_input());
    cert.record_hash(digest).unwrap();
    let err = cert.record_anchor(anchor_for(digest)).unwrap_err();
    assert!(matches!(err, EngineError::State { operation: "anchor", .. }));

    // re-hash after sign
    let mut cert = draft_certificate();
    cert.record_hash(digest).unwrap();
    cert.attach_signature(signer.sign(&digest).to_vec(), signer.identity())
        .unwrap();
    assert!(cert.record_hash(digest).is_err());
}

#[test]
fn revoke_is_reachable_from_every_state_but_terminal() {
    let signer = CertificateSigner::generate();

    for stage in 0..=3 {
        let mut cert = draft_certificate();
        let digest = certificate_digest(&cert.hash_input());
        if stage >= 1 {
            cert.record_hash(digest).unwrap();
        }
        if stage >= 2 {
            cert.attach_signature(signer.sign(&digest).to_vec(), signer.identity())
                .unwrap();
        }
        if stage >= 3 {
            cert.record_anchor(anchor_for(digest)).unwrap();
        }

        cert.revoke().unwrap();
        assert_eq!(cert.status, CertificateStatus::Revoked);

        // terminal: no operation leaves Revoked
        assert!(cert.revoke().is_err());
        assert!(cert.record_hash(digest).is_err());
        assert!(cert
            .attach_signature(vec![0u8; 64], signer.identity())
            .is_err());
        assert!(cert.record_anchor(anchor_for(digest)).is_err());
    }
}

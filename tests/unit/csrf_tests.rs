//! CSRF Token Unit Tests
//!
//! Tests token issuance and verification:
//! - Valid tokens verify within their lifetime
//! - Expired, future-dated and tampered tokens are rejected
//! - Tokens are bound to the signing secret

use dashboard_api::middleware::CsrfState;

const NOW: i64 = 1_700_000_000;

#[test]
fn test_fresh_token_verifies() {
    let state = CsrfState::new("secret", 7200);
    let token = state.issue_at(NOW);
    assert!(state.verify_at(&token, NOW));
    assert!(state.verify_at(&token, NOW + 7200));
}

#[test]
fn test_expired_token_rejected() {
    let state = CsrfState::new("secret", 7200);
    let token = state.issue_at(NOW);
    assert!(!state.verify_at(&token, NOW + 7201));
}

#[test]
fn test_future_token_rejected() {
    let state = CsrfState::new("secret", 7200);
    let token = state.issue_at(NOW + 60);
    assert!(!state.verify_at(&token, NOW));
}

#[test]
fn test_tampered_token_rejected() {
    let state = CsrfState::new("secret", 7200);
    let token = state.issue_at(NOW);

    // Move the issue time forward while keeping the old signature
    let (_, rest) = token.split_once('.').unwrap();
    let forged = format!("{}.{}", NOW + 100, rest);
    assert!(!state.verify_at(&forged, NOW + 100));

    let mut flipped = token.clone();
    let last = flipped.pop().unwrap();
    flipped.push(if last == '0' { '1' } else { '0' });
    assert!(!state.verify_at(&flipped, NOW));
}

#[test]
fn test_other_secret_rejected() {
    let issuer = CsrfState::new("secret-a", 7200);
    let verifier = CsrfState::new("secret-b", 7200);
    assert!(!verifier.verify_at(&issuer.issue_at(NOW), NOW));
}

#[test]
fn test_malformed_tokens_rejected() {
    let state = CsrfState::new("secret", 7200);
    for token in ["", "abc", "1.2", "x.y.z", "1700000000..", "1700000000.zz.00"] {
        assert!(!state.verify_at(token, NOW), "{:?} should be rejected", token);
    }
}

#[test]
fn test_tokens_are_unique() {
    let state = CsrfState::new("secret", 7200);
    assert_ne!(state.issue_at(NOW), state.issue_at(NOW));
}

#[test]
fn test_generated_secret() {
    let secret = CsrfState::generate_secret();
    assert_eq!(secret.len(), 64);
    assert_ne!(secret, CsrfState::generate_secret());
}

#[test]
fn test_extreme_issue_times_rejected() {
    let state = CsrfState::new("secret", 7200);
    let nonce = "0".repeat(32);
    for issued_at in [i64::MIN, i64::MAX] {
        let token = format!("{}.{}.{}", issued_at, nonce, "ab".repeat(32));
        assert!(!state.verify_at(&token, NOW));
    }
    assert!(!state.verify_at(&state.issue_at(i64::MIN), NOW));
}

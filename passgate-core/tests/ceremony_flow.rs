//! End-to-end ceremony flows through the public `Authority` API

use std::sync::Arc;

use chrono::Duration;
use passgate_core::{
    Authority, AuthorityConfig, ManualClock, MockVerifier, PassgateError,
};

const CREDENTIAL_ID: &str = "Y3JlZC1ib2I";
const PUBLIC_KEY: &[u8] = b"bob-public-key";

fn authority_with_clock() -> (Arc<Authority>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let authority = Authority::with_clock(
        AuthorityConfig::default(),
        Arc::new(MockVerifier::new()),
        clock.clone(),
    );
    (Arc::new(authority), clock)
}

fn origin(authority: &Authority) -> String {
    authority.config().origin.clone()
}

fn register(authority: &Authority, username: &str) {
    let options = authority.begin_registration(username, None).unwrap();
    let response = MockVerifier::registration_response(
        CREDENTIAL_ID,
        PUBLIC_KEY,
        &options.challenge,
        &origin(authority),
    );
    authority.finish_registration(username, &response).unwrap();
}

fn authenticate(authority: &Authority, username: &str, counter: u32) -> Result<String, PassgateError> {
    let options = authority.begin_authentication(username)?;
    let response = MockVerifier::authentication_response(
        CREDENTIAL_ID,
        PUBLIC_KEY,
        &options.challenge,
        &origin(authority),
        counter,
    );
    authority.finish_authentication(username, &response)
}

#[test]
fn test_bob_end_to_end() {
    let (authority, _clock) = authority_with_clock();

    register(&authority, "bob");
    let code = authenticate(&authority, "bob", 1).unwrap();
    let token = authority.exchange_code(&code).unwrap();

    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.expires_in, 3600);

    let profile = authority.current_user(&token.access_token).unwrap();
    assert_eq!(profile.username, "bob");
    assert_eq!(profile.credentials_count, 1);

    let json = serde_json::to_value(&profile).unwrap();
    assert_eq!(json["credentialsCount"], 1);
    assert!(json["registeredAt"].is_string());
}

#[test]
fn test_second_begin_invalidates_first_challenge() {
    let (authority, _clock) = authority_with_clock();
    let first = authority.begin_registration("bob", None).unwrap();
    let _second = authority.begin_registration("bob", None).unwrap();

    let response = MockVerifier::registration_response(
        CREDENTIAL_ID,
        PUBLIC_KEY,
        &first.challenge,
        &origin(&authority),
    );
    let err = authority.finish_registration("bob", &response).unwrap_err();
    assert!(matches!(
        err,
        PassgateError::ChallengeMissing | PassgateError::AttestationInvalid
    ));
    assert_eq!(authority.user_profile("bob").unwrap().credentials_count, 0);
}

#[test]
fn test_counter_must_strictly_increase() {
    let (authority, _clock) = authority_with_clock();
    register(&authority, "bob");

    assert!(authenticate(&authority, "bob", 1).is_ok());
    assert!(authenticate(&authority, "bob", 5).is_ok());
    assert_eq!(
        authenticate(&authority, "bob", 5),
        Err(PassgateError::AssertionInvalid)
    );
    assert_eq!(
        authenticate(&authority, "bob", 3),
        Err(PassgateError::AssertionInvalid)
    );
    assert!(authenticate(&authority, "bob", 6).is_ok());
}

#[test]
fn test_zero_counter_authenticator_is_accepted() {
    let (authority, _clock) = authority_with_clock();
    register(&authority, "bob");

    assert!(authenticate(&authority, "bob", 0).is_ok());
    assert!(authenticate(&authority, "bob", 0).is_ok());
}

#[test]
fn test_challenge_consumed_by_failed_assertion() {
    let (authority, _clock) = authority_with_clock();
    register(&authority, "bob");

    let options = authority.begin_authentication("bob").unwrap();
    let origin = origin(&authority);
    let bad = MockVerifier::authentication_response(
        CREDENTIAL_ID,
        b"wrong-key",
        &options.challenge,
        &origin,
        1,
    );
    assert_eq!(
        authority.finish_authentication("bob", &bad),
        Err(PassgateError::AssertionInvalid)
    );

    let good =
        MockVerifier::authentication_response(CREDENTIAL_ID, PUBLIC_KEY, &options.challenge, &origin, 1);
    assert_eq!(
        authority.finish_authentication("bob", &good),
        Err(PassgateError::ChallengeMissing)
    );
}

#[test]
fn test_code_is_single_use() {
    let (authority, _clock) = authority_with_clock();
    register(&authority, "bob");
    let code = authenticate(&authority, "bob", 1).unwrap();

    assert!(authority.exchange_code(&code).is_ok());
    assert_eq!(
        authority.exchange_code(&code),
        Err(PassgateError::CodeNotFound)
    );
}

#[test]
fn test_expired_code_is_rejected_and_consumed() {
    let (authority, clock) = authority_with_clock();
    register(&authority, "bob");
    let code = authenticate(&authority, "bob", 1).unwrap();

    clock.advance(Duration::seconds(61));
    assert_eq!(authority.exchange_code(&code), Err(PassgateError::CodeExpired));
    assert_eq!(authority.exchange_code(&code), Err(PassgateError::CodeNotFound));
}

#[test]
fn test_token_expires_after_one_hour() {
    let (authority, clock) = authority_with_clock();
    register(&authority, "alice");
    let code = authenticate(&authority, "alice", 1).unwrap();
    let token = authority.exchange_code(&code).unwrap();

    assert_eq!(authority.verify_token(&token.access_token).unwrap(), "alice");

    clock.advance(Duration::seconds(3600));
    assert_eq!(
        authority.verify_token(&token.access_token),
        Err(PassgateError::TokenExpired)
    );
}

#[test]
fn test_stale_challenge_expires() {
    let (authority, clock) = authority_with_clock();
    let options = authority.begin_registration("bob", None).unwrap();

    clock.advance(Duration::seconds(301));
    let response = MockVerifier::registration_response(
        CREDENTIAL_ID,
        PUBLIC_KEY,
        &options.challenge,
        &origin(&authority),
    );
    assert_eq!(
        authority.finish_registration("bob", &response),
        Err(PassgateError::ChallengeMissing)
    );
}

#[test]
fn test_sweep_drops_expired_entries() {
    let (authority, clock) = authority_with_clock();
    register(&authority, "bob");
    authenticate(&authority, "bob", 1).unwrap();
    authority.begin_authentication("bob").unwrap();

    clock.advance(Duration::seconds(400));
    let report = authority.sweep_expired();
    assert_eq!(report.codes, 1);
    assert_eq!(report.challenges, 1);

    let stats = authority.stats();
    assert_eq!(stats.users, 1);
    assert_eq!(stats.pending_challenges, 0);
    assert_eq!(stats.outstanding_codes, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemption_succeeds_once() {
    let (authority, _clock) = authority_with_clock();
    register(&authority, "bob");
    let code = authenticate(&authority, "bob", 1).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let authority = authority.clone();
            let code = code.clone();
            tokio::spawn(async move { authority.exchange_code(&code) })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err, PassgateError::CodeNotFound),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_share_one_user() {
    let (authority, _clock) = authority_with_clock();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let authority = authority.clone();
            tokio::spawn(async move { authority.begin_registration("zoe", None).unwrap().user.id })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(authority.stats().users, 1);
}

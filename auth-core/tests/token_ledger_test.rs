//! Token lifecycle properties: single-use consumption, expiry, and the
//! behavior under concurrent consumers.

mod common;

use std::sync::Arc;

use auth_core::models::TokenPurpose;
use auth_core::services::TokenLedger;
use auth_core::store::memory::{ManualClock, MemoryTokenStore, RandomValueGenerator};
use auth_core::CoreError;
use chrono::{Duration, Utc};
use tokio::sync::Barrier;
use uuid::Uuid;

fn ledger_with_clock() -> (TokenLedger, Arc<ManualClock>) {
    common::init_tracing();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let ledger = TokenLedger::new(
        Arc::new(MemoryTokenStore::new()),
        clock.clone(),
        Arc::new(RandomValueGenerator),
    );
    (ledger, clock)
}

#[tokio::test]
async fn test_consume_succeeds_exactly_once() {
    let (ledger, _clock) = ledger_with_clock();
    let account_id = Uuid::new_v4();

    let token = ledger
        .issue(account_id, TokenPurpose::Verify, Duration::hours(24))
        .await
        .unwrap();

    let consumed = ledger.consume(&token.value, TokenPurpose::Verify).await;
    assert_eq!(consumed.unwrap(), account_id);

    let second = ledger.consume(&token.value, TokenPurpose::Verify).await;
    assert!(matches!(second, Err(CoreError::TokenAlreadyUsed)));
}

#[tokio::test]
async fn test_expired_token_fails_with_token_expired() {
    let (ledger, clock) = ledger_with_clock();

    let token = ledger
        .issue(Uuid::new_v4(), TokenPurpose::ResetPassword, Duration::hours(1))
        .await
        .unwrap();

    clock.advance(Duration::hours(2));

    let result = ledger
        .consume(&token.value, TokenPurpose::ResetPassword)
        .await;
    assert!(matches!(result, Err(CoreError::TokenExpired)));
}

#[tokio::test]
async fn test_unknown_token_fails_with_not_found() {
    let (ledger, _clock) = ledger_with_clock();
    let result = ledger.consume("no-such-token", TokenPurpose::Verify).await;
    assert!(matches!(result, Err(CoreError::TokenNotFound)));
}

#[tokio::test]
async fn test_purpose_mismatch_detected() {
    let (ledger, _clock) = ledger_with_clock();

    let token = ledger
        .issue(Uuid::new_v4(), TokenPurpose::Verify, Duration::hours(1))
        .await
        .unwrap();

    let result = ledger
        .consume(&token.value, TokenPurpose::ResetPassword)
        .await;
    assert!(matches!(result, Err(CoreError::PurposeMismatch)));

    // The mismatch did not burn the token.
    assert!(ledger.consume(&token.value, TokenPurpose::Verify).await.is_ok());
}

#[tokio::test]
async fn test_multiple_outstanding_tokens_stay_valid() {
    let (ledger, _clock) = ledger_with_clock();
    let account_id = Uuid::new_v4();

    let first = ledger
        .issue(account_id, TokenPurpose::ResetPassword, Duration::hours(1))
        .await
        .unwrap();
    let second = ledger
        .issue(account_id, TokenPurpose::ResetPassword, Duration::hours(1))
        .await
        .unwrap();

    // Issuing the second token did not invalidate the first.
    assert!(ledger
        .consume(&first.value, TokenPurpose::ResetPassword)
        .await
        .is_ok());
    assert!(ledger
        .consume(&second.value, TokenPurpose::ResetPassword)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_reissue_replaces_value_and_extends_expiry() {
    let (ledger, clock) = ledger_with_clock();
    let account_id = Uuid::new_v4();

    let token = ledger
        .issue(account_id, TokenPurpose::Verify, Duration::hours(1))
        .await
        .unwrap();

    clock.advance(Duration::minutes(50));
    let reissued = ledger
        .reissue(&token.value, TokenPurpose::Verify, Duration::hours(1))
        .await
        .unwrap();
    assert_ne!(reissued.value, token.value);

    // The old value is gone; the new one outlives the original expiry.
    let old = ledger.consume(&token.value, TokenPurpose::Verify).await;
    assert!(matches!(old, Err(CoreError::TokenNotFound)));

    clock.advance(Duration::minutes(30));
    assert_eq!(
        ledger
            .consume(&reissued.value, TokenPurpose::Verify)
            .await
            .unwrap(),
        account_id
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_consume_has_single_winner() {
    const RACERS: usize = 16;

    let (ledger, _clock) = ledger_with_clock();
    let token = ledger
        .issue(Uuid::new_v4(), TokenPurpose::ResetPassword, Duration::hours(1))
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(RACERS));
    let mut handles = Vec::with_capacity(RACERS);
    for _ in 0..RACERS {
        let ledger = ledger.clone();
        let value = token.value.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            ledger.consume(&value, TokenPurpose::ResetPassword).await
        }));
    }

    let mut winners = 0;
    let mut losers = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(CoreError::TokenAlreadyUsed) => losers += 1,
            Err(other) => panic!("unexpected error under race: {other}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(losers, RACERS - 1);
}

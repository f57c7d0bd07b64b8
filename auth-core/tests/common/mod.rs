//! Test helper module for auth-core integration tests.
//!
//! Assembles the service facade over the in-memory adapters with a manual
//! clock, so tests control time explicitly.

#![allow(dead_code)]

use std::sync::Arc;

use auth_core::models::Account;
use auth_core::store::memory::{
    ManualClock, MemoryAccountStore, MemoryFactorStore, MemoryTokenStore, RandomValueGenerator,
};
use auth_core::{AccountService, Argon2Encoder, CoreConfig, PasswordMaterial, RegisterAccount};
use chrono::Utc;

pub const TEST_PASSWORD: &str = "correct-horse-battery";
pub const OTHER_PASSWORD: &str = "another-good-password";

/// The assembled core plus handles to its collaborators.
pub struct TestCore {
    pub service: Arc<AccountService>,
    pub clock: Arc<ManualClock>,
    pub accounts: Arc<MemoryAccountStore>,
    pub tokens: Arc<MemoryTokenStore>,
    pub factors: Arc<MemoryFactorStore>,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();
}

/// Build the core over fresh in-memory stores.
pub fn build_core(config: CoreConfig) -> TestCore {
    init_tracing();

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let accounts = Arc::new(MemoryAccountStore::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let factors = Arc::new(MemoryFactorStore::new());

    let service = AccountService::new(
        config,
        accounts.clone(),
        tokens.clone(),
        factors.clone(),
        clock.clone(),
        Arc::new(RandomValueGenerator),
        Arc::new(Argon2Encoder),
    )
    .expect("failed to build core service");

    TestCore {
        service: Arc::new(service),
        clock,
        accounts,
        tokens,
        factors,
    }
}

pub fn default_core() -> TestCore {
    build_core(CoreConfig::default())
}

/// Register an account and walk it through email verification.
pub async fn register_enabled(core: &TestCore, email: &str) -> Account {
    let (account, token) = core
        .service
        .register_account(RegisterAccount {
            email: email.to_string(),
            password: PasswordMaterial::from(TEST_PASSWORD),
        })
        .await
        .expect("registration failed");

    core.service
        .verify_account(&token.value)
        .await
        .expect("verification failed");

    core.service
        .load_account(account.account_id)
        .await
        .expect("account missing after verification")
}

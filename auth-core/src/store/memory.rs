//! In-memory reference adapters.
//!
//! Back the integration tests and small embeddings. DashMap entry locks
//! supply the per-key atomicity the ports require: consumption is a
//! check-and-set under one entry guard, failure counting a read-modify-write
//! under the same, and factor removal checks and removes against a single
//! locked slab.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

use async_trait::async_trait;

use crate::models::{Account, AuthFactor, AuthToken, FactorKind};
use crate::store::{
    AccountStore, Clock, FactorRemoval, FactorStore, TokenStore, ValueGenerator,
};

/// Account storage over a process-local map.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: DashMap<Uuid, Account>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn load_by_id(&self, account_id: Uuid) -> Result<Option<Account>, anyhow::Error> {
        Ok(self.accounts.get(&account_id).map(|a| a.clone()))
    }

    async fn load_by_email(&self, email: &str) -> Result<Option<Account>, anyhow::Error> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn save(&self, account: &Account) -> Result<(), anyhow::Error> {
        self.accounts.insert(account.account_id, account.clone());
        Ok(())
    }

    async fn increment_failed_attempts(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, anyhow::Error> {
        match self.accounts.get_mut(&account_id) {
            Some(mut account) => {
                account.failed_attempts = account.failed_attempts.saturating_add(1);
                account.last_failed_utc = Some(now);
                Ok(Some(account.failed_attempts))
            }
            None => Ok(None),
        }
    }
}

/// Token storage over a process-local map keyed by token value.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<String, AuthToken>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, token: &AuthToken) -> Result<(), anyhow::Error> {
        self.tokens.insert(token.value.clone(), token.clone());
        Ok(())
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<AuthToken>, anyhow::Error> {
        Ok(self.tokens.get(value).map(|t| t.clone()))
    }

    async fn atomic_consume(
        &self,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, anyhow::Error> {
        match self.tokens.get_mut(value) {
            Some(mut token) if token.consumed_utc.is_none() => {
                token.consumed_utc = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reissue(
        &self,
        value: &str,
        new_value: &str,
        expires_utc: DateTime<Utc>,
    ) -> Result<Option<AuthToken>, anyhow::Error> {
        match self.tokens.remove_if(value, |_, t| t.consumed_utc.is_none()) {
            Some((_, mut token)) => {
                token.value = new_value.to_string();
                token.expires_utc = expires_utc;
                self.tokens.insert(new_value.to_string(), token.clone());
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    async fn delete_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<u64, anyhow::Error> {
        let expired: Vec<String> = self
            .tokens
            .iter()
            .filter(|entry| entry.value().expires_utc < cutoff)
            .map(|entry| entry.key().clone())
            .take(limit)
            .collect();

        let mut purged = 0u64;
        for value in expired {
            if self
                .tokens
                .remove_if(&value, |_, t| t.expires_utc < cutoff)
                .is_some()
            {
                purged += 1;
            }
        }
        Ok(purged)
    }
}

/// Per-account factor slab; one entry lock covers the factor list, the
/// password hash, and the hash history.
#[derive(Default, Clone)]
struct FactorSlab {
    factors: Vec<AuthFactor>,
    password_hash: Option<String>,
    hash_history: Vec<String>,
}

/// Factor storage over a process-local map.
#[derive(Default)]
pub struct MemoryFactorStore {
    slabs: DashMap<Uuid, FactorSlab>,
}

impl MemoryFactorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FactorStore for MemoryFactorStore {
    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<AuthFactor>, anyhow::Error> {
        let mut factors = self
            .slabs
            .get(&account_id)
            .map(|slab| slab.factors.clone())
            .unwrap_or_default();
        factors.sort_by_key(|f| f.created_utc);
        Ok(factors)
    }

    async fn insert(&self, factor: &AuthFactor) -> Result<bool, anyhow::Error> {
        let mut slab = self.slabs.entry(factor.account_id).or_default();
        if slab
            .factors
            .iter()
            .any(|f| f.credential_id == factor.credential_id)
        {
            return Ok(false);
        }
        slab.factors.push(factor.clone());
        Ok(true)
    }

    async fn remove_if_not_last(
        &self,
        account_id: Uuid,
        credential_id: &str,
        enforce_min: bool,
    ) -> Result<FactorRemoval, anyhow::Error> {
        let mut slab = match self.slabs.get_mut(&account_id) {
            Some(slab) => slab,
            None => return Ok(FactorRemoval::NotFound),
        };
        let index = match slab
            .factors
            .iter()
            .position(|f| f.credential_id == credential_id)
        {
            Some(index) => index,
            None => return Ok(FactorRemoval::NotFound),
        };
        if enforce_min && slab.factors.len() == 1 {
            return Ok(FactorRemoval::LastFactor);
        }
        let removed = slab.factors.remove(index);
        if removed.kind == FactorKind::Password {
            slab.password_hash = None;
        }
        Ok(FactorRemoval::Removed)
    }

    async fn relabel(
        &self,
        account_id: Uuid,
        credential_id: &str,
        label: &str,
    ) -> Result<bool, anyhow::Error> {
        if let Some(mut slab) = self.slabs.get_mut(&account_id) {
            if let Some(factor) = slab
                .factors
                .iter_mut()
                .find(|f| f.credential_id == credential_id)
            {
                factor.label = label.to_string();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn touch_last_used(
        &self,
        account_id: Uuid,
        credential_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, anyhow::Error> {
        if let Some(mut slab) = self.slabs.get_mut(&account_id) {
            if let Some(factor) = slab
                .factors
                .iter_mut()
                .find(|f| f.credential_id == credential_id)
            {
                factor.last_used_utc = Some(now);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn upsert_password(
        &self,
        factor: &AuthFactor,
        hash: &str,
        history_keep: usize,
    ) -> Result<(), anyhow::Error> {
        let mut slab = self.slabs.entry(factor.account_id).or_default();
        slab.factors
            .retain(|f| f.credential_id != factor.credential_id);
        slab.factors.push(factor.clone());
        slab.password_hash = Some(hash.to_string());
        slab.hash_history.insert(0, hash.to_string());
        slab.hash_history.truncate(history_keep);
        Ok(())
    }

    async fn password_hash(&self, account_id: Uuid) -> Result<Option<String>, anyhow::Error> {
        Ok(self
            .slabs
            .get(&account_id)
            .and_then(|slab| slab.password_hash.clone()))
    }

    async fn password_history(&self, account_id: Uuid) -> Result<Vec<String>, anyhow::Error> {
        Ok(self
            .slabs
            .get(&account_id)
            .map(|slab| slab.hash_history.clone())
            .unwrap_or_default())
    }
}

/// Wall clock.
#[derive(Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests.
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .expect("manual clock millis in range")
    }
}

/// 32 random bytes, hex encoded.
#[derive(Default, Clone)]
pub struct RandomValueGenerator;

impl ValueGenerator for RandomValueGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let token_bytes: [u8; 32] = rng.gen();
        hex::encode(token_bytes)
    }
}

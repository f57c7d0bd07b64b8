//! Storage and environment ports.
//!
//! Persistence mechanics belong to collaborators; this crate only states
//! what must hold. The contracts that matter under concurrency:
//! `atomic_consume` is a single compare-against-null-and-set,
//! `increment_failed_attempts` is an atomic read-modify-write returning the
//! post-increment count, and `remove_if_not_last` evaluates the factor count
//! against a consistent snapshot at the moment of removal.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Account, AuthFactor, AuthToken};

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn load_by_id(&self, account_id: Uuid) -> Result<Option<Account>, anyhow::Error>;

    /// Lookup by normalized (lowercased) email.
    async fn load_by_email(&self, email: &str) -> Result<Option<Account>, anyhow::Error>;

    async fn save(&self, account: &Account) -> Result<(), anyhow::Error>;

    /// Atomically bump `failed_attempts` and stamp `last_failed_utc`,
    /// returning the post-increment count, or None for an unknown account.
    async fn increment_failed_attempts(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, anyhow::Error>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, token: &AuthToken) -> Result<(), anyhow::Error>;

    async fn find_by_value(&self, value: &str) -> Result<Option<AuthToken>, anyhow::Error>;

    /// Conditional update: set `consumed_utc = now` iff it is currently null.
    /// Returns true for the single winning caller; false for everyone else
    /// and for unknown values.
    async fn atomic_consume(&self, value: &str, now: DateTime<Utc>)
        -> Result<bool, anyhow::Error>;

    /// Replace an unconsumed token's value and expiry in one step. Returns
    /// the updated token, or None when the value is unknown or the token was
    /// already consumed.
    async fn reissue(
        &self,
        value: &str,
        new_value: &str,
        expires_utc: DateTime<Utc>,
    ) -> Result<Option<AuthToken>, anyhow::Error>;

    /// Delete up to `limit` tokens with `expires_utc < cutoff`, regardless of
    /// consumption state. Returns the number deleted.
    async fn delete_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<u64, anyhow::Error>;
}

/// Outcome of a transactional factor removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorRemoval {
    Removed,
    NotFound,
    /// Removal would have left the account with zero factors.
    LastFactor,
}

#[async_trait]
pub trait FactorStore: Send + Sync {
    /// Factors ordered by creation time.
    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<AuthFactor>, anyhow::Error>;

    /// Returns false when a factor with the same credential id already
    /// exists for the account.
    async fn insert(&self, factor: &AuthFactor) -> Result<bool, anyhow::Error>;

    /// Remove a factor; when `enforce_min` is set, refuse a removal that
    /// would leave the account with no factors. Check and removal happen
    /// against one consistent snapshot.
    async fn remove_if_not_last(
        &self,
        account_id: Uuid,
        credential_id: &str,
        enforce_min: bool,
    ) -> Result<FactorRemoval, anyhow::Error>;

    /// Returns false when the factor does not exist.
    async fn relabel(
        &self,
        account_id: Uuid,
        credential_id: &str,
        label: &str,
    ) -> Result<bool, anyhow::Error>;

    /// Stamp `last_used_utc`. Returns false when the factor does not exist.
    async fn touch_last_used(
        &self,
        account_id: Uuid,
        credential_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, anyhow::Error>;

    /// Create or replace the password factor and its stored hash, retaining
    /// up to `history_keep` entries of hash history (current included).
    async fn upsert_password(
        &self,
        factor: &AuthFactor,
        hash: &str,
        history_keep: usize,
    ) -> Result<(), anyhow::Error>;

    /// Current password hash, if the account has a password factor.
    async fn password_hash(&self, account_id: Uuid) -> Result<Option<String>, anyhow::Error>;

    /// Stored hash history, most recent first (current hash included).
    async fn password_history(&self, account_id: Uuid) -> Result<Vec<String>, anyhow::Error>;
}

/// Time source. All expiry comparisons go through this.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Produces unguessable opaque token values.
pub trait ValueGenerator: Send + Sync {
    fn generate(&self) -> String;
}

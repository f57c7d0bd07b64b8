//! Failed-login tracking and account lockout.

use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Account, AccountState};
use crate::services::error::CoreError;
use crate::store::{AccountStore, Clock};

/// Lockout policy knobs.
///
/// A `max_failed_attempts` of 0 disables failure-based locking. When
/// `auto_unlock_after_minutes` is absent, only administrative unlock applies.
#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    #[serde(default)]
    pub auto_unlock_after_minutes: Option<i64>,
}

fn default_max_failed_attempts() -> u32 {
    5
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed_attempts(),
            auto_unlock_after_minutes: None,
        }
    }
}

impl LockoutConfig {
    fn auto_unlock_after(&self) -> Option<Duration> {
        self.auto_unlock_after_minutes.map(Duration::minutes)
    }
}

/// Tracks consecutive authentication failures and derives lock transitions.
#[derive(Clone)]
pub struct LockoutTracker {
    accounts: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    config: LockoutConfig,
}

impl LockoutTracker {
    pub fn new(accounts: Arc<dyn AccountStore>, clock: Arc<dyn Clock>, config: LockoutConfig) -> Self {
        Self {
            accounts,
            clock,
            config,
        }
    }

    /// Gate an authentication attempt before any credential comparison.
    ///
    /// Disabled and locked accounts are rejected here so the response leaks
    /// nothing about credential correctness. When an auto-unlock duration is
    /// configured and has elapsed, the account is unlocked for this attempt
    /// (counter reset first) and the refreshed account is returned.
    pub async fn ensure_attemptable(&self, account: &Account) -> Result<Account, CoreError> {
        match account.state {
            AccountState::Disabled => Err(CoreError::AccountDisabled),
            AccountState::Locked => {
                if let (Some(window), Some(last_failed)) =
                    (self.config.auto_unlock_after(), account.last_failed_utc)
                {
                    if self.clock.now() - last_failed > window {
                        let mut unlocked = account.clone();
                        unlocked.failed_attempts = 0;
                        unlocked.last_failed_utc = None;
                        unlocked.state = AccountState::Enabled;
                        self.accounts.save(&unlocked).await.map_err(CoreError::Store)?;
                        tracing::info!(account_id = %unlocked.account_id, "Account auto-unlocked");
                        return Ok(unlocked);
                    }
                }
                Err(CoreError::AccountLocked)
            }
            _ => Ok(account.clone()),
        }
    }

    /// Record a failed authentication attempt.
    ///
    /// The increment is an atomic read-modify-write in the store and the
    /// threshold is checked against the post-increment count.
    pub async fn record_failure(&self, account_id: Uuid) -> Result<AccountState, CoreError> {
        let now = self.clock.now();

        if self.config.max_failed_attempts == 0 {
            let account = self.load(account_id).await?;
            tracing::debug!(account_id = %account_id, "Login failed; locking disabled");
            return Ok(account.state);
        }

        let attempts = self
            .accounts
            .increment_failed_attempts(account_id, now)
            .await
            .map_err(CoreError::Store)?
            .ok_or(CoreError::AccountNotFound)?;

        let mut account = self.load(account_id).await?;
        if attempts >= self.config.max_failed_attempts && account.state == AccountState::Enabled {
            account.state = AccountState::Locked;
            account.last_failed_utc = Some(now);
            self.accounts.save(&account).await.map_err(CoreError::Store)?;
            tracing::warn!(
                account_id = %account_id,
                attempts,
                "Account locked after repeated failures"
            );
        } else {
            tracing::debug!(account_id = %account_id, attempts, "Login attempt failed");
        }
        Ok(account.state)
    }

    /// Record a successful authentication: the failure counter resets to 0.
    pub async fn record_success(&self, account_id: Uuid) -> Result<Account, CoreError> {
        let mut account = self.load(account_id).await?;
        account.failed_attempts = 0;
        account.last_failed_utc = None;
        if account.state == AccountState::Locked {
            account.state = AccountState::Enabled;
        }
        account.last_activity_utc = Some(self.clock.now());
        self.accounts.save(&account).await.map_err(CoreError::Store)?;
        tracing::debug!(account_id = %account_id, "Login succeeded; failure counter reset");
        Ok(account)
    }

    /// Administrative unlock: reset the counter and restore `Enabled`.
    pub async fn unlock(&self, account_id: Uuid) -> Result<Account, CoreError> {
        let mut account = self.load(account_id).await?;
        account.failed_attempts = 0;
        account.last_failed_utc = None;
        if account.state == AccountState::Locked {
            account.state = AccountState::Enabled;
        }
        self.accounts.save(&account).await.map_err(CoreError::Store)?;
        tracing::info!(account_id = %account_id, "Account unlocked");
        Ok(account)
    }

    /// Administrative lock, independent of the failure counter.
    pub async fn lock(&self, account_id: Uuid) -> Result<Account, CoreError> {
        let mut account = self.load(account_id).await?;
        if account.state == AccountState::Disabled {
            return Err(CoreError::AccountDisabled);
        }
        account.state = AccountState::Locked;
        account.last_failed_utc = Some(self.clock.now());
        self.accounts.save(&account).await.map_err(CoreError::Store)?;
        tracing::info!(account_id = %account_id, "Account locked administratively");
        Ok(account)
    }

    async fn load(&self, account_id: Uuid) -> Result<Account, CoreError> {
        self.accounts
            .load_by_id(account_id)
            .await
            .map_err(CoreError::Store)?
            .ok_or(CoreError::AccountNotFound)
    }
}

//! Authentication factor bookkeeping.
//!
//! Manages the factor set and the "at least one factor" invariant. No
//! cryptographic verification happens here; that belongs to collaborators.

use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Account, AuthFactor};
use crate::services::error::CoreError;
use crate::store::{Clock, FactorRemoval, FactorStore};

const MAX_LABEL_LENGTH: usize = 64;

/// Request to register a new passkey factor.
#[derive(Debug, Clone)]
pub struct NewPasskey {
    /// Authenticator-assigned credential id, unique per account.
    pub credential_id: String,
    pub label: String,
    pub backup_eligible: Option<bool>,
    pub backup_state: Option<bool>,
}

/// Maintains the set of authentication factors for an account.
#[derive(Clone)]
pub struct CredentialInventory {
    factors: Arc<dyn FactorStore>,
    clock: Arc<dyn Clock>,
}

impl CredentialInventory {
    pub fn new(factors: Arc<dyn FactorStore>, clock: Arc<dyn Clock>) -> Self {
        Self { factors, clock }
    }

    /// Register a passkey factor for the account.
    pub async fn add_passkey(
        &self,
        account: &Account,
        request: NewPasskey,
    ) -> Result<AuthFactor, CoreError> {
        let label = validate_label(&request.label)?;
        let now = self.clock.now();

        let mut factor =
            AuthFactor::new_passkey(account.account_id, &request.credential_id, &label, now);
        factor.backup_eligible = request.backup_eligible;
        factor.backup_state = request.backup_state;

        if !self.factors.insert(&factor).await.map_err(CoreError::Store)? {
            return Err(CoreError::DuplicateCredential);
        }

        tracing::info!(
            account_id = %account.account_id,
            kind = factor.kind.as_str(),
            credential_id = %factor.credential_id,
            "Factor added"
        );
        Ok(factor)
    }

    /// Remove a factor, refusing a removal that would leave a non-disabled
    /// account with no way to authenticate.
    pub async fn remove_factor(
        &self,
        account: &Account,
        credential_id: &str,
    ) -> Result<(), CoreError> {
        let enforce_min = !account.is_disabled();
        let outcome = self
            .factors
            .remove_if_not_last(account.account_id, credential_id, enforce_min)
            .await
            .map_err(CoreError::Store)?;

        match outcome {
            FactorRemoval::Removed => {
                tracing::info!(
                    account_id = %account.account_id,
                    credential_id = %credential_id,
                    "Factor removed"
                );
                Ok(())
            }
            FactorRemoval::NotFound => Err(CoreError::FactorNotFound),
            FactorRemoval::LastFactor => {
                tracing::warn!(
                    account_id = %account.account_id,
                    credential_id = %credential_id,
                    "Refused removal of last factor"
                );
                Err(CoreError::LastFactorRemovalDenied)
            }
        }
    }

    /// Rename a factor so users can identify it ("My iPhone", "Work laptop").
    pub async fn relabel_factor(
        &self,
        account: &Account,
        credential_id: &str,
        new_label: &str,
    ) -> Result<(), CoreError> {
        let label = validate_label(new_label)?;
        if !self
            .factors
            .relabel(account.account_id, credential_id, &label)
            .await
            .map_err(CoreError::Store)?
        {
            return Err(CoreError::FactorNotFound);
        }
        tracing::info!(
            account_id = %account.account_id,
            credential_id = %credential_id,
            "Factor relabeled"
        );
        Ok(())
    }

    /// Factors ordered by creation time.
    pub async fn list_factors(&self, account_id: Uuid) -> Result<Vec<AuthFactor>, CoreError> {
        self.factors
            .list_by_account(account_id)
            .await
            .map_err(CoreError::Store)
    }

    /// Stamp a factor's `last_used_utc` after a successful use.
    pub async fn record_factor_use(
        &self,
        account_id: Uuid,
        credential_id: &str,
    ) -> Result<(), CoreError> {
        let now = self.clock.now();
        if !self
            .factors
            .touch_last_used(account_id, credential_id, now)
            .await
            .map_err(CoreError::Store)?
        {
            return Err(CoreError::FactorNotFound);
        }
        Ok(())
    }

    /// Create or replace the password slot with freshly encoded material.
    pub(crate) async fn store_password(
        &self,
        account_id: Uuid,
        hash: &str,
        label: &str,
        history_keep: usize,
    ) -> Result<AuthFactor, CoreError> {
        let label = validate_label(label)?;
        let factor = AuthFactor::new_password(account_id, &label, self.clock.now());
        self.factors
            .upsert_password(&factor, hash, history_keep)
            .await
            .map_err(CoreError::Store)?;
        Ok(factor)
    }

    pub(crate) async fn password_hash(
        &self,
        account_id: Uuid,
    ) -> Result<Option<String>, CoreError> {
        self.factors
            .password_hash(account_id)
            .await
            .map_err(CoreError::Store)
    }

    pub(crate) async fn password_history(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<String>, CoreError> {
        self.factors
            .password_history(account_id)
            .await
            .map_err(CoreError::Store)
    }
}

/// Labels must be non-empty after trimming and at most 64 characters.
fn validate_label(label: &str) -> Result<String, CoreError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidLabel("label cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_LABEL_LENGTH {
        return Err(CoreError::InvalidLabel(format!(
            "label too long (max {} characters)",
            MAX_LABEL_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

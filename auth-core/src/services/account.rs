//! Account lifecycle operations.
//!
//! The facade the rest of the backend calls: registration, verification,
//! password reset, login outcomes, administrative state changes, factor
//! management, and privilege resolution. Composes the component services
//! over the storage ports.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::models::{
    normalize_email, Account, AccountState, AuthFactor, AuthToken, RoleDefinition,
    RoleHierarchyEdge, TokenPurpose,
};
use crate::services::error::CoreError;
use crate::services::hierarchy::RoleHierarchy;
use crate::services::inventory::{CredentialInventory, NewPasskey};
use crate::services::lockout::LockoutTracker;
use crate::services::policy::{PolicyError, PolicyService};
use crate::services::sweeper::ExpirationSweeper;
use crate::services::token_ledger::TokenLedger;
use crate::store::{AccountStore, Clock, FactorStore, TokenStore, ValueGenerator};
use crate::utils::password::{PasswordEncoder, PasswordMaterial};

const PASSWORD_FACTOR_LABEL: &str = "Password";

/// Request to register a new account with its initial password factor.
pub struct RegisterAccount {
    pub email: String,
    pub password: PasswordMaterial,
}

/// Request to add an authentication factor.
pub enum FactorRequest {
    Password {
        label: String,
        material: PasswordMaterial,
    },
    Passkey(NewPasskey),
}

/// Caller-owned context built after a successful authentication.
///
/// The caller invokes [`AccountService::session_context`] with the
/// authenticated account; application profiles compose around this rather
/// than extending the core account.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub account_id: Uuid,
    pub email: String,
    pub privileges: HashSet<String>,
}

/// Account security core facade.
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    ledger: TokenLedger,
    lockout: LockoutTracker,
    inventory: CredentialInventory,
    sweeper: ExpirationSweeper,
    encoder: Arc<dyn PasswordEncoder>,
    hierarchy: RwLock<Arc<RoleHierarchy>>,
    clock: Arc<dyn Clock>,
    config: CoreConfig,
}

impl AccountService {
    /// Build the facade, compiling the role hierarchy from configuration.
    ///
    /// Configuration errors here are fatal: a cyclic or duplicated hierarchy
    /// never produces a usable service.
    pub fn new(
        config: CoreConfig,
        accounts: Arc<dyn AccountStore>,
        tokens: Arc<dyn TokenStore>,
        factors: Arc<dyn FactorStore>,
        clock: Arc<dyn Clock>,
        values: Arc<dyn ValueGenerator>,
        encoder: Arc<dyn PasswordEncoder>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let hierarchy =
            RoleHierarchy::compile(&config.roles.definitions(), &config.roles.edges()?)?;

        Ok(Self {
            accounts: accounts.clone(),
            ledger: TokenLedger::new(tokens.clone(), clock.clone(), values),
            lockout: LockoutTracker::new(accounts, clock.clone(), config.lockout.clone()),
            inventory: CredentialInventory::new(factors, clock.clone()),
            sweeper: ExpirationSweeper::new(tokens, clock.clone(), config.sweeper.clone()),
            encoder,
            hierarchy: RwLock::new(Arc::new(hierarchy)),
            clock,
            config,
        })
    }

    // --- registration and verification ---

    /// Register a new account.
    ///
    /// The account starts in `PendingVerification` with the configured
    /// default roles and its initial password factor, and a verification
    /// token is issued for the caller to deliver.
    pub async fn register_account(
        &self,
        request: RegisterAccount,
    ) -> Result<(Account, AuthToken), CoreError> {
        let email = normalize_email(&request.email);
        if self
            .accounts
            .load_by_email(&email)
            .await
            .map_err(CoreError::Store)?
            .is_some()
        {
            tracing::debug!(email = %email, "Registration rejected; email exists");
            return Err(CoreError::EmailAlreadyRegistered);
        }

        PolicyService::validate_password(request.password.expose(), &self.config.password_policy)?;

        let account = Account::new(
            &email,
            self.config.roles.default_roles.clone(),
            self.clock.now(),
        );
        self.accounts.save(&account).await.map_err(CoreError::Store)?;

        let hash = self
            .encoder
            .encode(&request.password)
            .map_err(CoreError::Internal)?;
        self.inventory
            .store_password(
                account.account_id,
                hash.as_str(),
                PASSWORD_FACTOR_LABEL,
                self.history_keep(),
            )
            .await?;

        let token = self
            .ledger
            .issue(
                account.account_id,
                TokenPurpose::Verify,
                self.config.tokens.verification_ttl(),
            )
            .await?;

        tracing::info!(account_id = %account.account_id, "Account registered");
        Ok((account, token))
    }

    /// Issue a fresh verification token, e.g. to re-send the email.
    pub async fn issue_verification_token(&self, account_id: Uuid) -> Result<AuthToken, CoreError> {
        let account = self.load_account(account_id).await?;
        if account.is_disabled() {
            return Err(CoreError::AccountDisabled);
        }
        self.ledger
            .issue(
                account_id,
                TokenPurpose::Verify,
                self.config.tokens.verification_ttl(),
            )
            .await
    }

    /// Replace an outstanding verification token's value and extend its
    /// expiry, without issuing a second token.
    pub async fn reissue_verification_token(
        &self,
        existing_value: &str,
    ) -> Result<AuthToken, CoreError> {
        self.ledger
            .reissue(
                existing_value,
                TokenPurpose::Verify,
                self.config.tokens.verification_ttl(),
            )
            .await
    }

    /// Consume a verification token and enable the account.
    pub async fn verify_account(&self, token_value: &str) -> Result<Account, CoreError> {
        let account_id = self.ledger.consume(token_value, TokenPurpose::Verify).await?;
        let mut account = self.load_account(account_id).await?;

        if account.is_disabled() {
            return Err(CoreError::AccountDisabled);
        }
        if account.state == AccountState::PendingVerification {
            account.state = AccountState::Enabled;
            self.accounts.save(&account).await.map_err(CoreError::Store)?;
            tracing::info!(account_id = %account_id, "Account verified");
        }
        Ok(account)
    }

    // --- password reset and change ---

    /// Issue a password reset token for the email's account.
    ///
    /// Unknown or disabled accounts yield `Ok(None)` so the response does
    /// not reveal whether the email is registered.
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<Option<AuthToken>, CoreError> {
        let email = normalize_email(email);
        let account = match self
            .accounts
            .load_by_email(&email)
            .await
            .map_err(CoreError::Store)?
        {
            Some(account) if !account.is_disabled() => account,
            _ => {
                tracing::debug!("Password reset requested for unknown or disabled account");
                return Ok(None);
            }
        };

        let token = self
            .ledger
            .issue(
                account.account_id,
                TokenPurpose::ResetPassword,
                self.config.tokens.reset_ttl(),
            )
            .await?;
        tracing::info!(account_id = %account.account_id, "Password reset requested");
        Ok(Some(token))
    }

    /// Consume a reset token exactly once and store the new credential.
    ///
    /// The token is validated and the new material checked against policy
    /// before the consumption, so a rejected password does not burn the
    /// token; the atomic consume still decides the single winner under a
    /// race. The raw material is wiped when it drops, on success and on
    /// every error path.
    pub async fn consume_password_reset(
        &self,
        token_value: &str,
        new_material: PasswordMaterial,
    ) -> Result<Uuid, CoreError> {
        let account_id = self
            .ledger
            .peek(token_value, TokenPurpose::ResetPassword)
            .await?;
        let account = self.load_account(account_id).await?;
        if account.is_disabled() {
            return Err(CoreError::AccountDisabled);
        }

        self.validate_new_password(account_id, &new_material).await?;

        self.ledger
            .consume(token_value, TokenPurpose::ResetPassword)
            .await?;

        let hash = self
            .encoder
            .encode(&new_material)
            .map_err(CoreError::Internal)?;
        self.inventory
            .store_password(
                account_id,
                hash.as_str(),
                PASSWORD_FACTOR_LABEL,
                self.history_keep(),
            )
            .await?;

        tracing::info!(account_id = %account_id, "Password reset completed");
        Ok(account_id)
    }

    /// Change the password of an authenticated account, verifying the
    /// current material first.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current: PasswordMaterial,
        new_material: PasswordMaterial,
    ) -> Result<(), CoreError> {
        let account = self.load_account(account_id).await?;
        if account.is_disabled() {
            return Err(CoreError::AccountDisabled);
        }

        let stored = self
            .inventory
            .password_hash(account_id)
            .await?
            .ok_or(CoreError::InvalidCredentials)?;
        if !self
            .encoder
            .matches(&current, &stored)
            .map_err(CoreError::Internal)?
        {
            tracing::warn!(account_id = %account_id, "Password change rejected; current password wrong");
            return Err(CoreError::InvalidCredentials);
        }

        self.validate_new_password(account_id, &new_material).await?;

        let hash = self
            .encoder
            .encode(&new_material)
            .map_err(CoreError::Internal)?;
        self.inventory
            .store_password(
                account_id,
                hash.as_str(),
                PASSWORD_FACTOR_LABEL,
                self.history_keep(),
            )
            .await?;

        tracing::info!(account_id = %account_id, "Password changed");
        Ok(())
    }

    // --- authentication outcomes ---

    /// Gate an authentication attempt before any credential comparison.
    ///
    /// Locked and disabled accounts are rejected here, so the caller can
    /// return `AccountLocked`/`AccountDisabled` without touching the
    /// credential. Performs the implicit auto-unlock when configured.
    pub async fn begin_login_attempt(&self, email: &str) -> Result<Account, CoreError> {
        let email = normalize_email(email);
        let account = self
            .accounts
            .load_by_email(&email)
            .await
            .map_err(CoreError::Store)?
            .ok_or(CoreError::AccountNotFound)?;
        self.lockout.ensure_attemptable(&account).await
    }

    /// Record the outcome of a finished authentication attempt.
    pub async fn record_login_outcome(
        &self,
        account_id: Uuid,
        success: bool,
    ) -> Result<AccountState, CoreError> {
        if success {
            let account = self.lockout.record_success(account_id).await?;
            Ok(account.state)
        } else {
            self.lockout.record_failure(account_id).await
        }
    }

    /// Administrative unlock.
    pub async fn unlock_account(&self, account_id: Uuid) -> Result<Account, CoreError> {
        self.lockout.unlock(account_id).await
    }

    /// Administrative lock.
    pub async fn lock_account(&self, account_id: Uuid) -> Result<Account, CoreError> {
        self.lockout.lock(account_id).await
    }

    /// Disable an account. The core never physically deletes accounts.
    pub async fn disable_account(&self, account_id: Uuid) -> Result<Account, CoreError> {
        let mut account = self.load_account(account_id).await?;
        account.state = AccountState::Disabled;
        self.accounts.save(&account).await.map_err(CoreError::Store)?;
        tracing::info!(account_id = %account_id, "Account disabled");
        Ok(account)
    }

    // --- factors ---

    /// Add an authentication factor.
    pub async fn add_factor(
        &self,
        account_id: Uuid,
        request: FactorRequest,
    ) -> Result<AuthFactor, CoreError> {
        let account = self.load_account(account_id).await?;
        if account.is_disabled() {
            return Err(CoreError::AccountDisabled);
        }

        match request {
            FactorRequest::Password { label, material } => {
                if self.inventory.password_hash(account_id).await?.is_some() {
                    return Err(CoreError::DuplicateCredential);
                }
                PolicyService::validate_password(material.expose(), &self.config.password_policy)?;
                let hash = self.encoder.encode(&material).map_err(CoreError::Internal)?;
                self.inventory
                    .store_password(account_id, hash.as_str(), &label, self.history_keep())
                    .await
            }
            FactorRequest::Passkey(passkey) => self.inventory.add_passkey(&account, passkey).await,
        }
    }

    /// Remove a factor, subject to last-factor protection.
    pub async fn remove_factor(
        &self,
        account_id: Uuid,
        credential_id: &str,
    ) -> Result<(), CoreError> {
        let account = self.load_account(account_id).await?;
        self.inventory.remove_factor(&account, credential_id).await
    }

    /// Rename a factor.
    pub async fn relabel_factor(
        &self,
        account_id: Uuid,
        credential_id: &str,
        new_label: &str,
    ) -> Result<(), CoreError> {
        let account = self.load_account(account_id).await?;
        self.inventory
            .relabel_factor(&account, credential_id, new_label)
            .await
    }

    /// Factors ordered by creation time.
    pub async fn list_factors(&self, account_id: Uuid) -> Result<Vec<AuthFactor>, CoreError> {
        self.inventory.list_factors(account_id).await
    }

    /// Stamp a factor's `last_used_utc` after it authenticated successfully.
    pub async fn mark_factor_used(
        &self,
        account_id: Uuid,
        credential_id: &str,
    ) -> Result<(), CoreError> {
        self.inventory
            .record_factor_use(account_id, credential_id)
            .await
    }

    // --- authorization ---

    /// Expand granted role names into the effective privilege set.
    pub async fn resolve_privileges(&self, granted_roles: &[String]) -> HashSet<String> {
        let hierarchy = self.hierarchy.read().await.clone();
        hierarchy.resolve(granted_roles.iter().map(String::as_str))
    }

    /// Build the post-authentication context for the caller.
    pub async fn session_context(&self, account: &Account) -> SessionContext {
        SessionContext {
            account_id: account.account_id,
            email: account.email.clone(),
            privileges: self.resolve_privileges(&account.granted_roles).await,
        }
    }

    /// Recompile and atomically swap the role hierarchy.
    ///
    /// Readers observe either the previous table or the new one, never a
    /// partial state. A failed compile leaves the previous table in place.
    pub async fn reload_hierarchy(
        &self,
        roles: &[RoleDefinition],
        edges: &[RoleHierarchyEdge],
    ) -> Result<(), CoreError> {
        let compiled = RoleHierarchy::compile(roles, edges)?;
        *self.hierarchy.write().await = Arc::new(compiled);
        tracing::info!("Role hierarchy reloaded");
        Ok(())
    }

    // --- maintenance ---

    /// Scheduled entry point: purge expired tokens. The schedule belongs to
    /// an external timer.
    pub async fn purge_expired_tokens(&self) -> Result<u64, CoreError> {
        self.sweeper.purge_expired().await
    }

    /// The account, whatever its state.
    pub async fn load_account(&self, account_id: Uuid) -> Result<Account, CoreError> {
        self.accounts
            .load_by_id(account_id)
            .await
            .map_err(CoreError::Store)?
            .ok_or(CoreError::AccountNotFound)
    }

    /// Lookup by email, normalized.
    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, CoreError> {
        self.accounts
            .load_by_email(&normalize_email(email))
            .await
            .map_err(CoreError::Store)
    }

    // --- helpers ---

    async fn validate_new_password(
        &self,
        account_id: Uuid,
        material: &PasswordMaterial,
    ) -> Result<(), CoreError> {
        PolicyService::validate_password(material.expose(), &self.config.password_policy)?;

        if self.config.password_policy.history_count > 0 {
            for old_hash in self.inventory.password_history(account_id).await? {
                if self
                    .encoder
                    .matches(material, &old_hash)
                    .map_err(CoreError::Internal)?
                {
                    return Err(CoreError::PolicyViolation(
                        PolicyError::PasswordPreviouslyUsed,
                    ));
                }
            }
        }
        Ok(())
    }

    /// History entries retained: the current hash plus the configured number
    /// of previous ones.
    fn history_keep(&self) -> usize {
        self.config.password_policy.history_count as usize + 1
    }
}

//! Single-use token issuance and consumption.

use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{AuthToken, TokenPurpose};
use crate::services::error::CoreError;
use crate::store::{Clock, TokenStore, ValueGenerator};

/// Issues, validates, and single-use-consumes action tokens.
///
/// Issuing never revokes outstanding tokens for the same account and
/// purpose; revocation policy belongs to the caller.
#[derive(Clone)]
pub struct TokenLedger {
    tokens: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    values: Arc<dyn ValueGenerator>,
}

impl TokenLedger {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        values: Arc<dyn ValueGenerator>,
    ) -> Self {
        Self {
            tokens,
            clock,
            values,
        }
    }

    /// Issue a fresh token for the account.
    pub async fn issue(
        &self,
        account_id: Uuid,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<AuthToken, CoreError> {
        let now = self.clock.now();
        let token = AuthToken::new(self.values.generate(), account_id, purpose, now, ttl);
        self.tokens.insert(&token).await.map_err(CoreError::Store)?;
        tracing::debug!(
            account_id = %account_id,
            purpose = purpose.as_str(),
            expires_utc = %token.expires_utc,
            "Token issued"
        );
        Ok(token)
    }

    /// Consume a token exactly once and return the account it belongs to.
    ///
    /// The consumption itself is a conditional update in the store, so under
    /// a race exactly one caller succeeds and the rest see
    /// `TokenAlreadyUsed` - a normal outcome, kept distinct from
    /// `TokenExpired` and `TokenNotFound` so callers can answer accurately.
    pub async fn consume(&self, value: &str, purpose: TokenPurpose) -> Result<Uuid, CoreError> {
        let token = self
            .tokens
            .find_by_value(value)
            .await
            .map_err(CoreError::Store)?
            .ok_or(CoreError::TokenNotFound)?;

        if token.purpose != purpose {
            return Err(CoreError::PurposeMismatch);
        }
        if token.is_consumed() {
            return Err(CoreError::TokenAlreadyUsed);
        }
        let now = self.clock.now();
        if token.is_expired(now) {
            return Err(CoreError::TokenExpired);
        }

        if !self
            .tokens
            .atomic_consume(value, now)
            .await
            .map_err(CoreError::Store)?
        {
            return Err(CoreError::TokenAlreadyUsed);
        }

        tracing::info!(
            account_id = %token.account_id,
            purpose = purpose.as_str(),
            "Token consumed"
        );
        Ok(token.account_id)
    }

    /// Validate a token without consuming it and return the account it
    /// belongs to.
    ///
    /// Lets a caller check preconditions of the guarded action before the
    /// single consumption; the atomic consume that follows still decides the
    /// winner under a race.
    pub async fn peek(&self, value: &str, purpose: TokenPurpose) -> Result<Uuid, CoreError> {
        let token = self
            .tokens
            .find_by_value(value)
            .await
            .map_err(CoreError::Store)?
            .ok_or(CoreError::TokenNotFound)?;

        if token.purpose != purpose {
            return Err(CoreError::PurposeMismatch);
        }
        if token.is_consumed() {
            return Err(CoreError::TokenAlreadyUsed);
        }
        if token.is_expired(self.clock.now()) {
            return Err(CoreError::TokenExpired);
        }
        Ok(token.account_id)
    }

    /// Give an outstanding, unconsumed token a fresh value and expiry.
    pub async fn reissue(
        &self,
        value: &str,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<AuthToken, CoreError> {
        let token = self
            .tokens
            .find_by_value(value)
            .await
            .map_err(CoreError::Store)?
            .ok_or(CoreError::TokenNotFound)?;

        if token.purpose != purpose {
            return Err(CoreError::PurposeMismatch);
        }
        if token.is_consumed() {
            return Err(CoreError::TokenAlreadyUsed);
        }

        let now = self.clock.now();
        let new_value = self.values.generate();
        let reissued = self
            .tokens
            .reissue(value, &new_value, now + ttl)
            .await
            .map_err(CoreError::Store)?
            .ok_or(CoreError::TokenAlreadyUsed)?;

        tracing::info!(
            account_id = %reissued.account_id,
            purpose = purpose.as_str(),
            "Token reissued"
        );
        Ok(reissued)
    }
}

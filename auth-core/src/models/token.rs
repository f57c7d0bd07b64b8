//! Single-use action token model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Verify,
    ResetPassword,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Verify => "verify",
            TokenPurpose::ResetPassword => "reset_password",
        }
    }
}

/// A single-use token authorizing one sensitive action.
///
/// Lifecycle: issued, then either consumed exactly once or swept after
/// expiry. A non-null `consumed_utc` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub value: String,
    pub account_id: Uuid,
    pub purpose: TokenPurpose,
    pub issued_utc: DateTime<Utc>,
    pub expires_utc: DateTime<Utc>,
    pub consumed_utc: Option<DateTime<Utc>>,
}

impl AuthToken {
    pub fn new(
        value: String,
        account_id: Uuid,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            value,
            account_id,
            purpose,
            issued_utc: now,
            expires_utc: now + ttl,
            consumed_utc: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_utc
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_utc.is_some()
    }

    /// Usable means not yet consumed and not yet expired.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_consumed() && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usable_until_expiry() {
        let now = Utc::now();
        let token = AuthToken::new(
            "t".to_string(),
            Uuid::new_v4(),
            TokenPurpose::Verify,
            now,
            Duration::hours(24),
        );
        assert!(token.is_usable(now));
        assert!(token.is_usable(now + Duration::hours(23)));
        assert!(!token.is_usable(now + Duration::hours(24)));
        assert!(token.is_expired(now + Duration::hours(25)));
    }

    #[test]
    fn test_consumed_token_not_usable() {
        let now = Utc::now();
        let mut token = AuthToken::new(
            "t".to_string(),
            Uuid::new_v4(),
            TokenPurpose::ResetPassword,
            now,
            Duration::hours(1),
        );
        token.consumed_utc = Some(now);
        assert!(token.is_consumed());
        assert!(!token.is_usable(now));
    }
}

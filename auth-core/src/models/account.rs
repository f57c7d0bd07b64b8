//! Account model - lifecycle state and lockout counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    PendingVerification,
    Enabled,
    Locked,
    Disabled,
}

impl AccountState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountState::PendingVerification => "pending_verification",
            AccountState::Enabled => "enabled",
            AccountState::Locked => "locked",
            AccountState::Disabled => "disabled",
        }
    }
}

/// Account entity.
///
/// Never physically deleted by this crate; disabling is the terminal
/// administrative action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: Uuid,
    pub email: String,
    pub state: AccountState,
    pub failed_attempts: u32,
    pub last_failed_utc: Option<DateTime<Utc>>,
    pub granted_roles: Vec<String>,
    pub registered_utc: DateTime<Utc>,
    pub last_activity_utc: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a new account awaiting email verification.
    ///
    /// The email is normalized to lowercase; lookups go through the same
    /// normalization so the uniqueness constraint is case-insensitive.
    pub fn new(email: &str, granted_roles: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            account_id: Uuid::new_v4(),
            email: normalize_email(email),
            state: AccountState::PendingVerification,
            failed_attempts: 0,
            last_failed_utc: None,
            granted_roles,
            registered_utc: now,
            last_activity_utc: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state == AccountState::Enabled
    }

    pub fn is_locked(&self) -> bool {
        self.state == AccountState::Locked
    }

    pub fn is_disabled(&self) -> bool {
        self.state == AccountState::Disabled
    }
}

/// Lowercase an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_pending() {
        let account = Account::new("User@Example.COM", vec!["ROLE_USER".to_string()], Utc::now());
        assert_eq!(account.state, AccountState::PendingVerification);
        assert_eq!(account.email, "user@example.com");
        assert_eq!(account.failed_attempts, 0);
        assert!(account.last_failed_utc.is_none());
    }

    #[test]
    fn test_state_predicates() {
        let mut account = Account::new("a@b.c", vec![], Utc::now());
        assert!(!account.is_enabled());
        account.state = AccountState::Enabled;
        assert!(account.is_enabled());
        account.state = AccountState::Locked;
        assert!(account.is_locked());
        account.state = AccountState::Disabled;
        assert!(account.is_disabled());
    }
}

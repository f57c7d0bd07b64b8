//! Authentication factor model - passwords and passkeys bound to an account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Credential id of the single password slot. Passkeys carry their own
/// authenticator-assigned credential ids.
pub const PASSWORD_CREDENTIAL_ID: &str = "password";

/// Factor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Password,
    Passkey,
}

impl FactorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKind::Password => "password",
            FactorKind::Passkey => "passkey",
        }
    }
}

/// One authentication factor. Bookkeeping only; credential material and its
/// verification live behind the factor store and the password encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthFactor {
    pub account_id: Uuid,
    pub credential_id: String,
    pub kind: FactorKind,
    pub label: String,
    pub created_utc: DateTime<Utc>,
    pub last_used_utc: Option<DateTime<Utc>>,
    pub backup_eligible: Option<bool>,
    pub backup_state: Option<bool>,
}

impl AuthFactor {
    /// The password slot factor for an account.
    pub fn new_password(account_id: Uuid, label: &str, now: DateTime<Utc>) -> Self {
        Self {
            account_id,
            credential_id: PASSWORD_CREDENTIAL_ID.to_string(),
            kind: FactorKind::Password,
            label: label.to_string(),
            created_utc: now,
            last_used_utc: None,
            backup_eligible: None,
            backup_state: None,
        }
    }

    /// A passkey factor with its authenticator-assigned credential id.
    pub fn new_passkey(
        account_id: Uuid,
        credential_id: &str,
        label: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            credential_id: credential_id.to_string(),
            kind: FactorKind::Passkey,
            label: label.to_string(),
            created_utc: now,
            last_used_utc: None,
            backup_eligible: None,
            backup_state: None,
        }
    }
}

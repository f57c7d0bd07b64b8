use thiserror::Error;

use crate::services::policy::PolicyError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Account is locked")]
    AccountLocked,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token already used")]
    TokenAlreadyUsed,

    #[error("Token purpose mismatch")]
    PurposeMismatch,

    #[error("Duplicate credential")]
    DuplicateCredential,

    #[error("Factor not found")]
    FactorNotFound,

    #[error("Cannot remove the last authentication factor")]
    LastFactorRemovalDenied,

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Role hierarchy contains a cycle through '{0}'")]
    CyclicHierarchyConfig(String),

    #[error("Duplicate role definition '{0}'")]
    DuplicateRoleDefinition(String),

    #[error("Password policy violation: {0}")]
    PolicyViolation(#[from] PolicyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

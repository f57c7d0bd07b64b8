//! Domain models for the account security core.

mod account;
mod factor;
mod role;
mod token;

pub use account::{normalize_email, Account, AccountState};
pub use factor::{AuthFactor, FactorKind, PASSWORD_CREDENTIAL_ID};
pub use role::{RoleDefinition, RoleHierarchyEdge};
pub use token::{AuthToken, TokenPurpose};

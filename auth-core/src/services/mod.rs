//! Services layer for the account security core.
//!
//! Component services (token ledger, lockout tracker, credential inventory,
//! expiration sweeper, role hierarchy) and the facade composing them.

pub mod account;
pub mod error;
pub mod hierarchy;
pub mod inventory;
pub mod lockout;
pub mod policy;
pub mod sweeper;
pub mod token_ledger;

pub use account::{AccountService, FactorRequest, RegisterAccount, SessionContext};
pub use error::CoreError;
pub use hierarchy::RoleHierarchy;
pub use inventory::{CredentialInventory, NewPasskey};
pub use lockout::{LockoutConfig, LockoutTracker};
pub use policy::{PasswordPolicy, PolicyError, PolicyService};
pub use sweeper::{ExpirationSweeper, SweeperConfig};
pub use token_ledger::TokenLedger;

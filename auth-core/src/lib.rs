//! Account security core.
//!
//! Governs how an account moves between verified, locked, and disabled
//! states, how single-use tokens authorize sensitive actions (email
//! verification, password reset), how repeated authentication failures
//! become lockouts, how the set of authentication factors stays non-empty,
//! and how role grants expand into effective privileges.
//!
//! Persistence, mail transport, and request routing belong to collaborators:
//! storage goes through the ports in [`store`], and the in-memory adapters
//! there back the tests and small embeddings.

pub mod config;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::CoreConfig;
pub use services::{AccountService, CoreError, FactorRequest, RegisterAccount, SessionContext};
pub use utils::password::{Argon2Encoder, PasswordEncoder, PasswordMaterial};

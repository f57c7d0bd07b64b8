use chrono::Duration;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::collections::HashMap;

use crate::models::{RoleDefinition, RoleHierarchyEdge};
use crate::services::error::CoreError;
use crate::services::lockout::LockoutConfig;
use crate::services::policy::PasswordPolicy;
use crate::services::sweeper::SweeperConfig;

/// Token lifetimes.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_verification_ttl_minutes")]
    pub verification_ttl_minutes: i64,
    #[serde(default = "default_reset_ttl_minutes")]
    pub reset_ttl_minutes: i64,
}

fn default_verification_ttl_minutes() -> i64 {
    24 * 60
}

fn default_reset_ttl_minutes() -> i64 {
    60
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            verification_ttl_minutes: default_verification_ttl_minutes(),
            reset_ttl_minutes: default_reset_ttl_minutes(),
        }
    }
}

impl TokenConfig {
    pub fn verification_ttl(&self) -> Duration {
        Duration::minutes(self.verification_ttl_minutes)
    }

    pub fn reset_ttl(&self) -> Duration {
        Duration::minutes(self.reset_ttl_minutes)
    }
}

/// Role definitions and inheritance, in the configuration's shape:
/// a role→privileges map plus `"PARENT > CHILD"` hierarchy entries.
#[derive(Debug, Clone, Deserialize)]
pub struct RolesConfig {
    #[serde(default)]
    pub roles: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub role_hierarchy: Vec<String>,
    /// Roles granted to every newly registered account.
    #[serde(default = "default_registration_roles")]
    pub default_roles: Vec<String>,
}

fn default_registration_roles() -> Vec<String> {
    vec!["ROLE_USER".to_string()]
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            roles: HashMap::new(),
            role_hierarchy: Vec::new(),
            default_roles: default_registration_roles(),
        }
    }
}

impl RolesConfig {
    pub fn definitions(&self) -> Vec<RoleDefinition> {
        self.roles
            .iter()
            .map(|(name, privileges)| RoleDefinition::new(name, privileges.iter().cloned()))
            .collect()
    }

    pub fn edges(&self) -> Result<Vec<RoleHierarchyEdge>, CoreError> {
        self.role_hierarchy
            .iter()
            .map(|spec| {
                RoleHierarchyEdge::parse(spec).ok_or_else(|| {
                    CoreError::Config(format!(
                        "malformed role hierarchy entry '{}' (expected 'PARENT > CHILD')",
                        spec
                    ))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub lockout: LockoutConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub password_policy: PasswordPolicy,
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub roles: RolesConfig,
}

impl CoreConfig {
    /// Load from the optional `configuration` file overlaid with
    /// `APP__`-prefixed environment variables.
    pub fn load() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        let config: CoreConfig = config
            .try_deserialize()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Fatal sanity checks; a half-usable configuration must not start.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.tokens.verification_ttl_minutes <= 0 {
            return Err(CoreError::Config(
                "tokens.verification_ttl_minutes must be positive".to_string(),
            ));
        }
        if self.tokens.reset_ttl_minutes <= 0 {
            return Err(CoreError::Config(
                "tokens.reset_ttl_minutes must be positive".to_string(),
            ));
        }
        if self.sweeper.batch_size == 0 {
            return Err(CoreError::Config(
                "sweeper.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.password_policy.min_length == 0 {
            return Err(CoreError::Config(
                "password_policy.min_length must be greater than 0".to_string(),
            ));
        }
        if let Some(minutes) = self.lockout.auto_unlock_after_minutes {
            if minutes <= 0 {
                return Err(CoreError::Config(
                    "lockout.auto_unlock_after_minutes must be positive when set".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lockout.max_failed_attempts, 5);
        assert_eq!(config.tokens.verification_ttl_minutes, 24 * 60);
        assert_eq!(config.tokens.reset_ttl_minutes, 60);
        assert_eq!(config.roles.default_roles, vec!["ROLE_USER".to_string()]);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = CoreConfig::default();
        config.tokens.reset_ttl_minutes = 0;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_nonpositive_auto_unlock_rejected() {
        let mut config = CoreConfig::default();
        config.lockout.auto_unlock_after_minutes = Some(0);
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_malformed_hierarchy_entry_rejected() {
        let mut config = CoreConfig::default();
        config.roles.role_hierarchy = vec!["ROLE_ADMIN ROLE_USER".to_string()];
        assert!(matches!(config.roles.edges(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_hierarchy_entries_parse() {
        let mut config = CoreConfig::default();
        config.roles.role_hierarchy = vec!["ROLE_ADMIN > ROLE_USER".to_string()];
        let edges = config.roles.edges().unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].parent, "ROLE_ADMIN");
    }
}

//! Password policy validation.
//!
//! Validates new credential material against the configured policy before it
//! is encoded and stored.

use serde::Deserialize;

/// Configurable password requirements.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordPolicy {
    #[serde(default = "default_min_length")]
    pub min_length: u8,
    #[serde(default)]
    pub require_uppercase: bool,
    #[serde(default)]
    pub require_number: bool,
    #[serde(default)]
    pub require_special: bool,
    /// How many previous passwords may not be reused. 0 disables the check.
    #[serde(default)]
    pub history_count: u8,
}

fn default_min_length() -> u8 {
    8
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            require_uppercase: false,
            require_number: false,
            require_special: false,
            history_count: 0,
        }
    }
}

/// Errors related to password policy validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Password is too short.
    PasswordTooShort {
        min_length: u8,
        actual_length: usize,
    },
    /// Password missing uppercase letter.
    PasswordMissingUppercase,
    /// Password missing number.
    PasswordMissingNumber,
    /// Password missing special character.
    PasswordMissingSpecial,
    /// Password matches one of the recently used passwords.
    PasswordPreviouslyUsed,
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::PasswordTooShort {
                min_length,
                actual_length,
            } => {
                write!(
                    f,
                    "Password must be at least {} characters (got {})",
                    min_length, actual_length
                )
            }
            PolicyError::PasswordMissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            PolicyError::PasswordMissingNumber => {
                write!(f, "Password must contain at least one number")
            }
            PolicyError::PasswordMissingSpecial => {
                write!(f, "Password must contain at least one special character")
            }
            PolicyError::PasswordPreviouslyUsed => {
                write!(f, "Password was used recently and may not be reused")
            }
        }
    }
}

impl std::error::Error for PolicyError {}

/// Password policy validation service.
#[derive(Debug, Clone)]
pub struct PolicyService;

impl PolicyService {
    /// Validate a password against the policy.
    ///
    /// Returns Ok(()) if the password meets all requirements,
    /// or Err with the first policy violation found.
    pub fn validate_password(password: &str, policy: &PasswordPolicy) -> Result<(), PolicyError> {
        if password.chars().count() < policy.min_length as usize {
            return Err(PolicyError::PasswordTooShort {
                min_length: policy.min_length,
                actual_length: password.chars().count(),
            });
        }

        if policy.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(PolicyError::PasswordMissingUppercase);
        }

        if policy.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PolicyError::PasswordMissingNumber);
        }

        if policy.require_special && !password.chars().any(is_special) {
            return Err(PolicyError::PasswordMissingSpecial);
        }

        Ok(())
    }
}

fn is_special(c: char) -> bool {
    matches!(
        c,
        '!' | '@'
            | '#'
            | '$'
            | '%'
            | '^'
            | '&'
            | '*'
            | '('
            | ')'
            | '-'
            | '_'
            | '='
            | '+'
            | '['
            | ']'
            | '{'
            | '}'
            | '|'
            | '\\'
            | ';'
            | ':'
            | '\''
            | '"'
            | ','
            | '.'
            | '<'
            | '>'
            | '/'
            | '?'
            | '`'
            | '~'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict_policy() -> PasswordPolicy {
        PasswordPolicy {
            min_length: 12,
            require_uppercase: true,
            require_number: true,
            require_special: true,
            history_count: 3,
        }
    }

    fn lenient_policy() -> PasswordPolicy {
        PasswordPolicy {
            min_length: 1,
            require_uppercase: false,
            require_number: false,
            require_special: false,
            history_count: 0,
        }
    }

    #[test]
    fn test_password_too_short() {
        let policy = strict_policy();
        let result = PolicyService::validate_password("Short1!", &policy);
        assert!(matches!(result, Err(PolicyError::PasswordTooShort { .. })));
    }

    #[test]
    fn test_password_missing_uppercase() {
        let policy = strict_policy();
        let result = PolicyService::validate_password("longenoughpassword1!", &policy);
        assert!(matches!(result, Err(PolicyError::PasswordMissingUppercase)));
    }

    #[test]
    fn test_password_missing_number() {
        let policy = strict_policy();
        let result = PolicyService::validate_password("LongEnoughPassword!", &policy);
        assert!(matches!(result, Err(PolicyError::PasswordMissingNumber)));
    }

    #[test]
    fn test_password_missing_special() {
        let policy = strict_policy();
        let result = PolicyService::validate_password("LongEnoughPassword1", &policy);
        assert!(matches!(result, Err(PolicyError::PasswordMissingSpecial)));
    }

    #[test]
    fn test_valid_password_strict() {
        let policy = strict_policy();
        let result = PolicyService::validate_password("LongEnoughP@ss1", &policy);
        assert!(result.is_ok());
    }

    #[test]
    fn test_valid_password_lenient() {
        let policy = lenient_policy();
        let result = PolicyService::validate_password("simple", &policy);
        assert!(result.is_ok());
    }
}

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use secrecy::{ExposeSecret, SecretString};

/// Raw credential material in transit.
///
/// Wraps the bytes in a zeroizing secret so they are overwritten when the
/// value is dropped, on every exit path. Does not implement Debug/Display
/// passthrough, so the material cannot end up in logs.
pub struct PasswordMaterial(SecretString);

impl PasswordMaterial {
    pub fn new(material: String) -> Self {
        Self(SecretString::new(material))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<String> for PasswordMaterial {
    fn from(material: String) -> Self {
        Self::new(material)
    }
}

impl From<&str> for PasswordMaterial {
    fn from(material: &str) -> Self {
        Self::new(material.to_string())
    }
}

/// Newtype for an encoded password hash
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Derives and verifies stored credential material.
///
/// Deployments substitute their own encoder; the default is Argon2id.
pub trait PasswordEncoder: Send + Sync {
    fn encode(&self, material: &PasswordMaterial) -> Result<PasswordHashString, anyhow::Error>;

    /// Ok(false) on mismatch; Err only for a malformed stored hash.
    fn matches(&self, material: &PasswordMaterial, hash: &str) -> Result<bool, anyhow::Error>;
}

/// Argon2id with default parameters and a random per-hash salt.
#[derive(Default, Clone)]
pub struct Argon2Encoder;

impl PasswordEncoder for Argon2Encoder {
    fn encode(&self, material: &PasswordMaterial) -> Result<PasswordHashString, anyhow::Error> {
        let argon2 = Argon2::default();
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = argon2
            .hash_password(material.expose().as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        Ok(PasswordHashString::new(password_hash))
    }

    fn matches(&self, material: &PasswordMaterial, hash: &str) -> Result<bool, anyhow::Error> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

        Ok(Argon2::default()
            .verify_password(material.expose().as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_password() {
        let material = PasswordMaterial::from("mySecurePassword123");
        let hash = Argon2Encoder.encode(&material).expect("Failed to hash password");

        // Hash should not be empty
        assert!(!hash.as_str().is_empty());

        // Hash should start with $argon2
        assert!(hash.as_str().starts_with("$argon2"));
    }

    #[test]
    fn test_matches_correct_password() {
        let material = PasswordMaterial::from("mySecurePassword123");
        let hash = Argon2Encoder.encode(&material).expect("Failed to hash password");

        assert!(Argon2Encoder.matches(&material, hash.as_str()).unwrap());
    }

    #[test]
    fn test_rejects_incorrect_password() {
        let material = PasswordMaterial::from("mySecurePassword123");
        let hash = Argon2Encoder.encode(&material).expect("Failed to hash password");

        let wrong = PasswordMaterial::from("wrongPassword");
        assert!(!Argon2Encoder.matches(&wrong, hash.as_str()).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let material = PasswordMaterial::from("mySecurePassword123");
        assert!(Argon2Encoder.matches(&material, "not-a-hash").is_err());
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let material = PasswordMaterial::from("mySecurePassword123");
        let hash1 = Argon2Encoder.encode(&material).expect("Failed to hash password");
        let hash2 = Argon2Encoder.encode(&material).expect("Failed to hash password");

        // Same password should produce different hashes (due to random salt)
        assert_ne!(hash1.as_str(), hash2.as_str());

        assert!(Argon2Encoder.matches(&material, hash1.as_str()).unwrap());
        assert!(Argon2Encoder.matches(&material, hash2.as_str()).unwrap());
    }
}

use crate::core::{RecordError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const BCRYPT_COST_KEY: &str = "bcrypt.iterations";
pub const AES_SECRET_KEY: &str = "aes256.secretKey";
pub const AES_SALT_KEY: &str = "aes256.salt";
pub const AES_ITERATIONS_KEY: &str = "aes256.iterations";

pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 65_536;

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

/// Crypto settings for encrypted record fields
///
/// Arrives already resolved; where it was loaded from is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// bcrypt work factor for one-way fields
    pub bcrypt_cost: u32,

    /// Passphrase the AES key is derived from
    pub aes_secret_key: String,

    /// Salt for the AES key derivation
    pub aes_salt: String,

    /// PBKDF2 rounds for the AES key derivation
    pub pbkdf2_iterations: u32,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            aes_secret_key: String::new(),
            aes_salt: String::new(),
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl RecordConfig {
    /// Create a configuration with the AES secret and salt
    pub fn new(aes_secret_key: &str, aes_salt: &str) -> Self {
        Self {
            aes_secret_key: aes_secret_key.to_string(),
            aes_salt: aes_salt.to_string(),
            ..Self::default()
        }
    }

    /// Set the bcrypt cost
    pub fn bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Set the PBKDF2 round count
    pub fn pbkdf2_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }

    /// Read a resolved key-value property set.
    ///
    /// Missing keys keep their defaults; present keys must parse.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(cost) = properties.get(BCRYPT_COST_KEY) {
            config.bcrypt_cost = parse_u32(BCRYPT_COST_KEY, cost)?;
        }
        if let Some(secret) = properties.get(AES_SECRET_KEY) {
            config.aes_secret_key = secret.clone();
        }
        if let Some(salt) = properties.get(AES_SALT_KEY) {
            config.aes_salt = salt.clone();
        }
        if let Some(iterations) = properties.get(AES_ITERATIONS_KEY) {
            config.pbkdf2_iterations = parse_u32(AES_ITERATIONS_KEY, iterations)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| RecordError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(RecordError::Config(format!(
                "bcrypt cost must be between {} and {}, got {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST, self.bcrypt_cost
            )));
        }
        if self.aes_secret_key.is_empty() {
            return Err(RecordError::Config(format!("'{}' must not be empty", AES_SECRET_KEY)));
        }
        if self.aes_salt.is_empty() {
            return Err(RecordError::Config(format!("'{}' must not be empty", AES_SALT_KEY)));
        }
        if self.pbkdf2_iterations == 0 {
            return Err(RecordError::Config("PBKDF2 iterations must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_u32(key: &str, raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|_| RecordError::Config(format!("'{}' is not a valid number: {}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = RecordConfig::new("secret", "salt").bcrypt_cost(4).pbkdf2_iterations(1000);
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(config.pbkdf2_iterations, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_properties() {
        let mut props = HashMap::new();
        props.insert(BCRYPT_COST_KEY.to_string(), "6".to_string());
        props.insert(AES_SECRET_KEY.to_string(), "s3cr3t".to_string());
        props.insert(AES_SALT_KEY.to_string(), "pepper".to_string());

        let config = RecordConfig::from_properties(&props).unwrap();
        assert_eq!(config.bcrypt_cost, 6);
        assert_eq!(config.aes_secret_key, "s3cr3t");
        assert_eq!(config.pbkdf2_iterations, DEFAULT_PBKDF2_ITERATIONS);
    }

    #[test]
    fn test_from_properties_rejects_bad_number() {
        let mut props = HashMap::new();
        props.insert(BCRYPT_COST_KEY.to_string(), "ten".to_string());
        let err = RecordConfig::from_properties(&props).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_json_uses_defaults() {
        let config =
            RecordConfig::from_json(r#"{"aes_secret_key":"k","aes_salt":"s","bcrypt_cost":5}"#).unwrap();
        assert_eq!(config.bcrypt_cost, 5);
        assert_eq!(config.pbkdf2_iterations, DEFAULT_PBKDF2_ITERATIONS);
    }

    #[test]
    fn test_validate_requires_secret() {
        assert!(RecordConfig::default().validate().is_err());
    }
}

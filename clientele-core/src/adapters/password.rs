//! Password encoder implementations
//!
//! - Argon2id PHC strings (default)
//! - Hex SHA-256 digests (deterministic, for stores that compare encoded values)

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::domain::result::{Error, Result};
use crate::ports::PasswordEncoder;

/// Length of generated salts, in bytes
const SALT_LEN: usize = 16;

/// Argon2id encoder producing self-describing PHC strings
///
/// Without an explicit salt a random one is generated per call, so encoding
/// the same password twice gives different strings. An explicit salt of any
/// length is reduced to its first 16 SHA-256 bytes. Verification reads the
/// salt back out of the PHC string and ignores the `salt` argument.
#[derive(Default)]
pub struct Argon2PasswordEncoder {
    argon2: Argon2<'static>,
}

impl Argon2PasswordEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use explicit cost parameters
    pub fn with_params(memory_cost: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = argon2::Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|e| Error::encoding(format!("Failed to create argon2 params: {:?}", e)))?;
        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        })
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode_password(&self, raw: &str, salt: Option<&str>) -> Result<String> {
        let salt = match salt {
            Some(s) => SaltString::encode_b64(&Sha256::digest(s.as_bytes())[..SALT_LEN]),
            None => {
                let bytes: [u8; SALT_LEN] = rand::thread_rng().gen();
                SaltString::encode_b64(&bytes)
            }
        }
        .map_err(|e| Error::encoding(format!("Invalid salt: {}", e)))?;

        let hash = self
            .argon2
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| Error::encoding(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn is_password_valid(&self, encoded: &str, raw: &str, _salt: Option<&str>) -> Result<bool> {
        let parsed = PasswordHash::new(encoded)
            .map_err(|e| Error::encoding(format!("Malformed password hash: {}", e)))?;
        Ok(self.argon2.verify_password(raw.as_bytes(), &parsed).is_ok())
    }
}

/// Hex SHA-256 of `raw`, or of `raw{salt}` when a salt is given
#[derive(Default)]
pub struct Sha256PasswordEncoder;

impl Sha256PasswordEncoder {
    fn digest(raw: &str, salt: Option<&str>) -> String {
        let merged = match salt {
            Some(s) if !s.is_empty() => format!("{}{{{}}}", raw, s),
            _ => raw.to_string(),
        };
        hex::encode(Sha256::digest(merged.as_bytes()))
    }
}

impl PasswordEncoder for Sha256PasswordEncoder {
    fn encode_password(&self, raw: &str, salt: Option<&str>) -> Result<String> {
        Ok(Self::digest(raw, salt))
    }

    fn is_password_valid(&self, encoded: &str, raw: &str, salt: Option<&str>) -> Result<bool> {
        Ok(Self::digest(raw, salt).eq_ignore_ascii_case(encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cheap parameters so tests don't spend seconds hashing
    fn fast_argon2() -> Argon2PasswordEncoder {
        Argon2PasswordEncoder::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_argon2_roundtrip() {
        let encoder = fast_argon2();
        let encoded = encoder.encode_password("secret", None).unwrap();

        assert!(encoded.starts_with("$argon2id$"));
        assert_ne!(encoded, "secret");
        assert!(encoder.is_password_valid(&encoded, "secret", None).unwrap());
        assert!(!encoder.is_password_valid(&encoded, "Secret", None).unwrap());
    }

    #[test]
    fn test_argon2_random_salt_differs_per_call() {
        let encoder = fast_argon2();
        let a = encoder.encode_password("secret", None).unwrap();
        let b = encoder.encode_password("secret", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_argon2_fixed_salt_is_deterministic() {
        let encoder = fast_argon2();
        let a = encoder.encode_password("secret", Some("store-wide-salt")).unwrap();
        let b = encoder.encode_password("secret", Some("store-wide-salt")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_argon2_accepts_salt_of_any_length() {
        let encoder = fast_argon2();
        let long = "x".repeat(200);
        for salt in ["", "ab", long.as_str()] {
            let encoded = encoder.encode_password("secret", Some(salt)).unwrap();
            assert!(encoder.is_password_valid(&encoded, "secret", Some(salt)).unwrap());
        }
        assert_ne!(
            encoder.encode_password("secret", Some("ab")).unwrap(),
            encoder.encode_password("secret", Some("abc")).unwrap()
        );
    }

    #[test]
    fn test_argon2_rejects_malformed_hash() {
        let encoder = fast_argon2();
        assert!(matches!(
            encoder.is_password_valid("not-a-phc-string", "secret", None),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_sha256_known_digest() {
        let encoded = Sha256PasswordEncoder.encode_password("abc", None).unwrap();
        assert_eq!(
            encoded,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_salt_changes_digest() {
        let encoder = Sha256PasswordEncoder;
        let plain = encoder.encode_password("secret", None).unwrap();
        let salted = encoder.encode_password("secret", Some("pepper")).unwrap();
        assert_ne!(plain, salted);
        assert!(encoder.is_password_valid(&salted, "secret", Some("pepper")).unwrap());
        assert!(!encoder.is_password_valid(&salted, "secret", None).unwrap());
    }
}

//! Password encoder port

use crate::domain::result::Result;

/// One-way encoding of passwords and challenge answers
pub trait PasswordEncoder: Send + Sync {
    /// Encode `raw`, optionally mixing in `salt`
    fn encode_password(&self, raw: &str, salt: Option<&str>) -> Result<String>;

    /// Check `raw` against a value previously produced by `encode_password`
    fn is_password_valid(&self, encoded: &str, raw: &str, salt: Option<&str>) -> Result<bool>;
}

//! Password change request

use std::fmt;

use serde::Deserialize;

use super::result::{Error, Result};

/// A request to replace a customer's password
///
/// Transient: never persisted, consumed once per change. It can be read
/// from JSON but never written back out.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub username: String,
    pub new_password: String,
    #[serde(default)]
    pub password_change_required: bool,
    /// Present when the caller re-enters the password it is replacing
    #[serde(default)]
    pub current_password: Option<String>,
    /// Present when the caller asked for the new password twice
    #[serde(default)]
    pub new_password_confirm: Option<String>,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChange")
            .field("username", &self.username)
            .field("password_change_required", &self.password_change_required)
            .finish_non_exhaustive()
    }
}

impl PasswordChange {
    pub fn new(username: impl Into<String>, new_password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            new_password: new_password.into(),
            ..Self::default()
        }
    }

    pub fn requiring_change(mut self, required: bool) -> Self {
        self.password_change_required = required;
        self
    }

    /// Validate the request before handing it to the customer service
    pub fn validate(&self, min_length: usize) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::validation("Username is required"));
        }
        if self.new_password.is_empty() {
            return Err(Error::validation("New password is required"));
        }
        if self.new_password.chars().count() < min_length {
            return Err(Error::validation(format!(
                "New password must be at least {} characters",
                min_length
            )));
        }
        if let Some(confirm) = &self.new_password_confirm {
            if confirm != &self.new_password {
                return Err(Error::validation("Passwords do not match"));
            }
        }
        Ok(())
    }
}

//! Customer domain model

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Type tag used when asking for ids or new instances of a customer
pub const CUSTOMER_ENTITY: &str = "customer";

/// A shopper known to the store
///
/// `password` and `challenge_answer` only ever hold encoded values once the
/// customer has been saved. The plaintext inputs live in the `unencoded_*`
/// fields, which are never serialized.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// None until the repository persists the customer
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,

    // =========================================================================
    // Credentials
    // =========================================================================
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    #[serde(skip)]
    pub unencoded_password: Option<String>,
    pub challenge_question: Option<String>,
    #[serde(skip_serializing, default)]
    pub challenge_answer: Option<String>,
    #[serde(skip)]
    pub unencoded_challenge_answer: Option<String>,

    // =========================================================================
    // Flags
    // =========================================================================
    #[serde(default)]
    pub password_change_required: bool,
    #[serde(default)]
    pub registered: bool,

    // Audit timestamps, maintained by the repository
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Create an unsaved customer with a username and email
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Set the plaintext password to be encoded on the next save
    pub fn with_unencoded_password(mut self, password: impl Into<String>) -> Self {
        self.unencoded_password = Some(password.into());
        self
    }

    /// Set the challenge question and the plaintext answer to be encoded on the next save
    pub fn with_challenge(
        mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        self.challenge_question = Some(question.into());
        self.unencoded_challenge_answer = Some(answer.into());
        self
    }

    /// Full display name, falling back to the username
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.username.clone().unwrap_or_default(),
        }
    }

    /// Check the fields a registration form must provide
    pub fn validate_registration(&self) -> Result<()> {
        match self.username.as_deref() {
            Some(u) if !u.trim().is_empty() => {}
            _ => return Err(Error::validation("Username is required")),
        }

        match self.email.as_deref() {
            Some(e) if is_valid_email(e) => {}
            Some(e) => return Err(Error::validation(format!("Invalid email address: {}", e))),
            None => return Err(Error::validation("Email is required")),
        }

        Ok(())
    }
}

/// Shows whether a secret is set, never its value
fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "[REDACTED]")
}

impl fmt::Debug for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Customer")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &redacted(&self.password))
            .field("unencoded_password", &redacted(&self.unencoded_password))
            .field("challenge_question", &self.challenge_question)
            .field("challenge_answer", &redacted(&self.challenge_answer))
            .field(
                "unencoded_challenge_answer",
                &redacted(&self.unencoded_challenge_answer),
            )
            .field("password_change_required", &self.password_change_required)
            .field("registered", &self.registered)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// Loose syntactic email check (something@domain.tld)
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

//! Authentication service - username/password login against stored customers

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{Authentication, SecurityContext};
use crate::ports::{CustomerRepository, PasswordEncoder};

/// Verifies credentials and installs the resulting token in a security context
pub struct AuthenticationService {
    customers: Arc<dyn CustomerRepository>,
    password_encoder: Arc<dyn PasswordEncoder>,
    salt: Option<String>,
    default_authorities: Vec<String>,
}

impl AuthenticationService {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        password_encoder: Arc<dyn PasswordEncoder>,
        salt: Option<String>,
        default_authorities: Vec<String>,
    ) -> Self {
        Self {
            customers,
            password_encoder,
            salt,
            default_authorities,
        }
    }

    /// Log `username` in, replacing whatever the context held
    ///
    /// Unknown users and wrong passwords fail with the same message.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
        security_context: &mut SecurityContext,
    ) -> Result<Arc<Authentication>> {
        let customer = self
            .customers
            .read_customer_by_username(username)?
            .ok_or_else(bad_credentials)?;
        let encoded = customer.password.as_deref().ok_or_else(bad_credentials)?;

        if !self
            .password_encoder
            .is_password_valid(encoded, password, self.salt.as_deref())?
        {
            return Err(bad_credentials());
        }

        let authentication = Arc::new(Authentication::authenticated(
            username,
            password,
            self.default_authorities.clone(),
        ));
        if let Some(previous) = security_context.set_authentication(Arc::clone(&authentication)) {
            previous.set_authenticated(false);
        }
        Ok(authentication)
    }
}

fn bad_credentials() -> Error {
    Error::authentication("Bad credentials")
}

//! Authentication tokens and the per-session security context

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// A username/password authentication token
///
/// Tokens are shared as `Arc<Authentication>`. The authenticated flag can be
/// cleared through any handle and every holder sees it.
pub struct Authentication {
    principal: String,
    credentials: String,
    authorities: Vec<String>,
    authenticated: AtomicBool,
}

impl Authentication {
    /// An unverified login request
    pub fn request(principal: impl Into<String>, credentials: impl Into<String>) -> Self {
        Self::new(principal, credentials, Vec::new(), false)
    }

    /// A verified token carrying granted authorities
    pub fn authenticated(
        principal: impl Into<String>,
        credentials: impl Into<String>,
        authorities: Vec<String>,
    ) -> Self {
        Self::new(principal, credentials, authorities, true)
    }

    fn new(
        principal: impl Into<String>,
        credentials: impl Into<String>,
        authorities: Vec<String>,
        authenticated: bool,
    ) -> Self {
        Self {
            principal: principal.into(),
            credentials: credentials.into(),
            authorities,
            authenticated: AtomicBool::new(authenticated),
        }
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn credentials(&self) -> &str {
        &self.credentials
    }

    pub fn authorities(&self) -> &[String] {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }

    /// Summary safe to print or log (no credentials)
    pub fn summary(&self) -> AuthenticationSummary {
        AuthenticationSummary {
            principal: self.principal.clone(),
            authorities: self.authorities.clone(),
            authenticated: self.is_authenticated(),
        }
    }
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("principal", &self.principal)
            .field("credentials", &"[REDACTED]")
            .field("authorities", &self.authorities)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Credential-free view of an authentication token
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticationSummary {
    pub principal: String,
    pub authorities: Vec<String>,
    pub authenticated: bool,
}

/// Holds the authentication of the current session
#[derive(Debug, Default)]
pub struct SecurityContext {
    authentication: Option<Arc<Authentication>>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authentication(authentication: Arc<Authentication>) -> Self {
        Self {
            authentication: Some(authentication),
        }
    }

    pub fn authentication(&self) -> Option<&Arc<Authentication>> {
        self.authentication.as_ref()
    }

    /// Install a new authentication, returning the one it replaced
    pub fn set_authentication(
        &mut self,
        authentication: Arc<Authentication>,
    ) -> Option<Arc<Authentication>> {
        self.authentication.replace(authentication)
    }

    pub fn clear(&mut self) -> Option<Arc<Authentication>> {
        self.authentication.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_is_shared() {
        let auth = Arc::new(Authentication::authenticated(
            "bob",
            "secret",
            vec!["ROLE_USER".to_string()],
        ));
        let held_elsewhere = Arc::clone(&auth);

        auth.set_authenticated(false);

        assert!(!held_elsewhere.is_authenticated());
        assert!(held_elsewhere.has_authority("ROLE_USER"));
    }

    #[test]
    fn test_set_authentication_returns_previous() {
        let first = Arc::new(Authentication::request("bob", "old"));
        let mut ctx = SecurityContext::with_authentication(Arc::clone(&first));

        let previous = ctx.set_authentication(Arc::new(Authentication::request("bob", "new")));

        assert!(Arc::ptr_eq(&previous.unwrap(), &first));
        assert_eq!(ctx.authentication().unwrap().credentials(), "new");
        assert!(ctx.clear().is_some());
        assert!(ctx.authentication().is_none());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let auth = Authentication::authenticated("bob", "hunter2", vec![]);
        let ctx = SecurityContext::with_authentication(Arc::new(auth));
        let rendered = format!("{:?}", ctx);
        assert!(rendered.contains("bob"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_summary_has_no_credentials() {
        let auth = Authentication::authenticated("bob", "secret", vec![]);
        let json = serde_json::to_string(&auth.summary()).unwrap();
        assert!(!json.contains("secret"));
    }
}

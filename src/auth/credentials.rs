// Session credentials shared between connections

use std::fmt;
use tokio::sync::RwLock;

/// Default identity provider for login
pub const DEFAULT_PROVIDER: &str = "Local";

/// How to authenticate against the server, plus the current session token.
///
/// A single `Credentials` is shared (behind an `Arc`) by every connection copied from the
/// same original, so a login performed through one connection is visible to all of them.
pub struct Credentials {
    username: Option<String>,
    password: Option<String>,
    provider: String,

    /// Bearer token from the last successful login, or pre-seeded by the caller
    session_token: RwLock<Option<String>>,
}

impl Credentials {
    /// Create credentials for a username/password login
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            provider: provider.into(),
            session_token: RwLock::new(None),
        }
    }

    /// Create credentials that can only replay an existing session token
    pub fn from_session_token(token: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            username: None,
            password: None,
            provider: provider.into(),
            session_token: RwLock::new(normalize(token.into())),
        }
    }

    /// Pre-seed an existing session token
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = RwLock::new(normalize(token.into()));
        self
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Username and password, if both are configured
    pub(crate) fn login_pair(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }

    /// Current session token
    pub async fn session_token(&self) -> Option<String> {
        self.session_token.read().await.clone()
    }

    /// Overwrite the session token. Empty tokens are stored as absent.
    pub async fn set_session_token(&self, token: impl Into<String>) {
        let mut current = self.session_token.write().await;
        *current = normalize(token.into());
    }
}

fn normalize(token: String) -> Option<String> {
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "..."))
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_has_no_token() {
        let creds = Credentials::new("admin", "secret", DEFAULT_PROVIDER);
        assert_eq!(creds.username(), Some("admin"));
        assert_eq!(creds.provider(), "Local");
        assert_eq!(creds.login_pair(), Some(("admin", "secret")));
        assert!(creds.session_token().await.is_none());
    }

    #[tokio::test]
    async fn test_seeded_token_and_overwrite() {
        let creds = Credentials::new("admin", "secret", "ActiveDirectory").with_session_token("seed");
        assert_eq!(creds.session_token().await.as_deref(), Some("seed"));

        creds.set_session_token("fresh").await;
        assert_eq!(creds.session_token().await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_empty_token_is_absent() {
        let creds = Credentials::from_session_token("", DEFAULT_PROVIDER);
        assert!(creds.session_token().await.is_none());

        let creds = Credentials::new("admin", "secret", DEFAULT_PROVIDER);
        creds.set_session_token("").await;
        assert!(creds.session_token().await.is_none());
    }

    #[test]
    fn test_token_only_credentials_cannot_login() {
        let creds = Credentials::from_session_token("abc", DEFAULT_PROVIDER);
        assert!(creds.login_pair().is_none());
        assert!(creds.username().is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("admin", "hunter2", DEFAULT_PROVIDER).with_session_token("tok-999");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("tok-999"));
    }
}

//! Token results and the acquisition backend seam.
//!
//! This module provides:
//! - [`AccessToken`] - A bearer token value that never appears in logs
//! - [`TokenResult`] - The outcome of one successful token acquisition
//! - [`Authenticator`] - Trait for the silent/interactive acquisition backend
//! - [`AuthError`] - Error type reported by the backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A bearer token value.
///
/// The inner string is only accessible via [`expose()`](AccessToken::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the memory is zeroed when the token is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a bearer token string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the token value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken([REDACTED])")
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// The outcome of one successful token acquisition.
///
/// Transient: the backend owns persistence of whatever credential produced
/// this token; nothing here is written back anywhere.
#[derive(Debug, Clone)]
pub struct TokenResult {
    /// The bearer token to present to the target resource.
    pub access_token: AccessToken,

    /// Identifier of the account the token was issued for, when known.
    pub user_id: Option<String>,

    /// When the token expires, when the backend reports it.
    ///
    /// Metadata only; the fallback chain never consults it.
    pub expires_on: Option<DateTime<Utc>>,
}

impl TokenResult {
    /// Create a token result from a bearer token value.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: AccessToken::new(access_token),
            user_id: None,
            expires_on: None,
        }
    }

    /// Attach the account identifier the token was issued for.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach the expiry timestamp reported by the backend.
    pub fn with_expiry(mut self, expires_on: DateTime<Utc>) -> Self {
        self.expires_on = Some(expires_on);
        self
    }
}

/// Error type reported by the acquisition backend.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The acquisition attempt failed.
    #[error("token acquisition failed: {message}")]
    Failed { message: String },

    /// The user dismissed the sign-in prompt.
    #[error("the sign-in prompt was dismissed by the user")]
    Cancelled,
}

/// Backend that actually obtains tokens.
///
/// Implementations wrap whatever identity library or endpoint the host uses.
/// [`TokenProvider`](crate::provider::TokenProvider) drives this trait; it
/// never caches or persists anything itself.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Obtain a token without user interaction, using a previously cached
    /// credential for `user_id` when one is given.
    async fn acquire_silent(
        &self,
        resource: &str,
        client_id: &str,
        user_id: Option<&str>,
    ) -> Result<TokenResult, AuthError>;

    /// Obtain a token via a user-facing sign-in prompt.
    ///
    /// A successful interactive acquisition is expected to update the
    /// backend's token cache before returning, so that a subsequent
    /// [`TokenCache::read_entries`](crate::cache::TokenCache::read_entries)
    /// observes the new credential.
    async fn acquire_interactive(
        &self,
        resource: &str,
        client_id: &str,
        redirect_uri: &str,
    ) -> Result<TokenResult, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_debug_redacted() {
        let token = AccessToken::new("very-secret-bearer");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("very-secret-bearer"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn access_token_display_redacted() {
        let token = AccessToken::new("very-secret-bearer");
        let display = format!("{}", token);
        assert!(!display.contains("very-secret-bearer"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn token_result_builders() {
        let expires = Utc::now() + chrono::Duration::hours(1);
        let result = TokenResult::new("abc")
            .with_user_id("user@example.com")
            .with_expiry(expires);

        assert_eq!(result.access_token.expose(), "abc");
        assert_eq!(result.user_id.as_deref(), Some("user@example.com"));
        assert_eq!(result.expires_on, Some(expires));
    }
}

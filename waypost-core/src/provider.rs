//! The cache-first token acquisition chain.
//!
//! [`TokenProvider`] reconciles three failure-prone steps into one
//! deterministic sequence: read the external cache, try a silent
//! acquisition when a usable entry exists, and fall back to an interactive
//! prompt. Silent failures are recovered locally; only cache-read and
//! interactive failures ever reach the caller.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::cache::{select_entry, CacheError, TokenCache};
use crate::token::{AuthError, Authenticator, TokenResult};

/// Error type for [`TokenProvider::acquire_token`].
#[derive(Debug, Error)]
pub enum TokenError {
    /// The external cache could not be read.
    #[error("token cache read failed: {0}")]
    CacheRead(#[from] CacheError),

    /// Interactive acquisition failed after all fallbacks.
    #[error("interactive token acquisition failed: {0}")]
    Interactive(#[source] AuthError),
}

/// Produces bearer tokens for target resources.
///
/// One provider serves one `(client_id, authority, redirect_uri)`
/// configuration; the cache and acquisition backend are injected.
///
/// # Example
///
/// ```rust,ignore
/// use waypost_core::{MemoryTokenCache, TokenProvider};
///
/// let provider = TokenProvider::new(
///     "my-client-id",
///     "https://login.example.net/tenant/",
///     "http://localhost/",
///     Arc::new(MemoryTokenCache::new()),
///     authenticator,
/// );
/// let token = provider.acquire_token("https://files.example.com/").await?;
/// ```
pub struct TokenProvider {
    client_id: String,
    authority: String,
    redirect_uri: String,
    cache: Arc<dyn TokenCache>,
    authenticator: Arc<dyn Authenticator>,
}

impl TokenProvider {
    /// Create a provider over the given cache and acquisition backend.
    pub fn new(
        client_id: impl Into<String>,
        authority: impl Into<String>,
        redirect_uri: impl Into<String>,
        cache: Arc<dyn TokenCache>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            authority: authority.into(),
            redirect_uri: redirect_uri.into(),
            cache,
            authenticator,
        }
    }

    /// The client id this provider acquires tokens for.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Obtain a bearer token for `resource`.
    ///
    /// Steps, strictly sequential:
    /// 1. Read all cache entries; a read failure is surfaced as
    ///    [`TokenError::CacheRead`].
    /// 2. Run the matching rule. No match: skip straight to step 4.
    /// 3. Attempt a silent acquisition with the matched entry's user id.
    ///    Success returns immediately. Failure falls through to step 4 —
    ///    the silent error is never surfaced.
    /// 4. Attempt an interactive acquisition. Its result, success or
    ///    failure, is the caller's outcome.
    pub async fn acquire_token(&self, resource: &str) -> Result<TokenResult, TokenError> {
        let entries = self.cache.read_entries().await?;

        match select_entry(&entries, &self.client_id, resource, &self.authority) {
            Some(entry) => {
                debug!(resource, "matching cache entry found, attempting silent acquisition");
                match self
                    .authenticator
                    .acquire_silent(resource, &self.client_id, entry.user_id.as_deref())
                    .await
                {
                    Ok(token) => return Ok(token),
                    Err(err) => {
                        // Deliberately swallowed: the interactive attempt
                        // below decides the outcome.
                        debug!(resource, error = %err, "silent acquisition failed, falling back to interactive");
                    }
                }
            }
            None => {
                debug!(resource, "no matching cache entry, going straight to interactive acquisition");
            }
        }

        self.authenticator
            .acquire_interactive(resource, &self.client_id, &self.redirect_uri)
            .await
            .map_err(TokenError::Interactive)
    }
}

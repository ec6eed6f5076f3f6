//! Top-level error type for Waypost.

use thiserror::Error;

use crate::broker::SignInError;
use crate::cache::CacheError;
use crate::discovery::DiscoveryError;
use crate::http::HttpError;
use crate::provider::TokenError;
use crate::token::AuthError;

/// Top-level error type encompassing all Waypost errors.
#[derive(Debug, Error)]
pub enum WaypostError {
    /// Error reading the external token cache.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error from the token acquisition chain.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Error reported by the acquisition backend.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Error from the interactive sign-in flow.
    #[error("sign-in error: {0}")]
    SignIn(#[from] SignInError),

    /// Error executing an HTTP request.
    #[error("http error: {0}")]
    Http(#[from] HttpError),

    /// Error resolving capabilities.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// A well-known capability was not advertised for the account.
    ///
    /// Raised by callers selecting an endpoint from a resolved capability
    /// list, never by the discovery client itself.
    #[error("no capability named '{name}' was advertised for this account")]
    CapabilityNotFound { name: String },
}

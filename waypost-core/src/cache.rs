//! Token cache access and the cache-matching rule.
//!
//! This module provides:
//! - [`CacheEntry`] - A snapshot of one stored credential
//! - [`TokenCache`] - Trait for reading the external token cache
//! - [`MemoryTokenCache`] - In-memory implementation for tests and demos
//! - [`select_entry`] - The matching rule deciding which entry (if any)
//!   backs a silent acquisition
//!
//! The cache itself is owned by the host's identity library; this subsystem
//! only ever reads it.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// Error type for cache reads.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache backend could not be reached.
    #[error("token cache backend unreachable: {message}")]
    Unreachable { message: String },
}

/// Immutable snapshot of one stored credential.
///
/// Read from the external cache; never written back by this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Client (application) id the credential was issued to.
    pub client_id: String,

    /// Resource the credential grants access to.
    pub resource: String,

    /// Identity-provider endpoint that issued the credential.
    pub authority: String,

    /// Account identifier, when the cache recorded one.
    pub user_id: Option<String>,

    /// Whether the entry holds a refresh token valid for any resource
    /// under its authority.
    #[serde(default)]
    pub is_multi_resource_refresh_token: bool,
}

impl CacheEntry {
    /// Create an entry for an exact `(client_id, resource)` pair.
    pub fn new(
        client_id: impl Into<String>,
        resource: impl Into<String>,
        authority: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            resource: resource.into(),
            authority: authority.into(),
            user_id: None,
            is_multi_resource_refresh_token: false,
        }
    }

    /// Attach the account identifier recorded with the credential.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Mark the entry as a multi-resource refresh token.
    pub fn multi_resource(mut self) -> Self {
        self.is_multi_resource_refresh_token = true;
        self
    }
}

/// Read access to the external token cache.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Read all stored entries.
    ///
    /// Returns an empty vec when the cache holds nothing.
    async fn read_entries(&self) -> Result<Vec<CacheEntry>, CacheError>;
}

/// In-memory token cache for tests and demos.
pub struct MemoryTokenCache {
    entries: RwLock<Vec<CacheEntry>>,
}

impl MemoryTokenCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Create a cache pre-populated with entries.
    pub fn with_entries(entries: Vec<CacheEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Append an entry.
    pub fn push(&self, entry: CacheEntry) {
        self.entries.write().push(entry);
    }
}

impl Default for MemoryTokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn read_entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        Ok(self.entries.read().clone())
    }
}

/// Append a trailing slash when absent, so `"https://a"` and `"https://a/"`
/// compare equal.
fn normalize_trailing_slash(uri: &str) -> Cow<'_, str> {
    if uri.ends_with('/') {
        Cow::Borrowed(uri)
    } else {
        Cow::Owned(format!("{uri}/"))
    }
}

/// Select the cache entry backing a silent acquisition, if any.
///
/// First match wins, in order:
/// 1. Exact: `client_id` and `resource` both equal.
/// 2. Fallback: same `client_id`, entry is a multi-resource refresh token,
///    and the authorities are equal up to a trailing slash.
///
/// `None` means no usable entry; that is not an error.
pub fn select_entry<'a>(
    entries: &'a [CacheEntry],
    client_id: &str,
    resource: &str,
    authority: &str,
) -> Option<&'a CacheEntry> {
    entries
        .iter()
        .find(|entry| entry.client_id == client_id && entry.resource == resource)
        .or_else(|| {
            entries.iter().find(|entry| {
                entry.client_id == client_id
                    && entry.is_multi_resource_refresh_token
                    && normalize_trailing_slash(&entry.authority)
                        == normalize_trailing_slash(authority)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT: &str = "client-1";
    const AUTHORITY: &str = "https://login.example.net/tenant";

    #[test]
    fn exact_match_wins() {
        let entries = vec![
            CacheEntry::new(CLIENT, "https://other.example.com/", AUTHORITY),
            CacheEntry::new(CLIENT, "https://files.example.com/", AUTHORITY),
        ];

        let selected = select_entry(&entries, CLIENT, "https://files.example.com/", AUTHORITY);
        assert_eq!(selected, Some(&entries[1]));
    }

    #[test]
    fn exact_match_precedes_multi_resource_fallback() {
        let entries = vec![
            CacheEntry::new(CLIENT, "https://other.example.com/", AUTHORITY).multi_resource(),
            CacheEntry::new(CLIENT, "https://files.example.com/", AUTHORITY),
        ];

        // Both entries are usable; the exact resource match must win even
        // though the fallback entry comes first.
        let selected = select_entry(&entries, CLIENT, "https://files.example.com/", AUTHORITY);
        assert_eq!(selected, Some(&entries[1]));
    }

    #[test]
    fn multi_resource_fallback_requires_flag() {
        let entries = vec![CacheEntry::new(
            CLIENT,
            "https://other.example.com/",
            AUTHORITY,
        )];

        let selected = select_entry(&entries, CLIENT, "https://files.example.com/", AUTHORITY);
        assert_eq!(selected, None);
    }

    #[test]
    fn authority_comparison_ignores_single_trailing_slash() {
        let entry = CacheEntry::new(CLIENT, "https://other.example.com/", "https://login/x")
            .multi_resource();
        let entries = vec![entry];

        assert!(select_entry(&entries, CLIENT, "r", "https://login/x").is_some());
        assert!(select_entry(&entries, CLIENT, "r", "https://login/x/").is_some());

        let slashed = vec![
            CacheEntry::new(CLIENT, "https://other.example.com/", "https://login/x/")
                .multi_resource(),
        ];
        assert!(select_entry(&slashed, CLIENT, "r", "https://login/x").is_some());
        assert!(select_entry(&slashed, CLIENT, "r", "https://login/x/").is_some());
    }

    #[test]
    fn fallback_requires_matching_client_id() {
        let entries = vec![
            CacheEntry::new("someone-else", "https://other.example.com/", AUTHORITY)
                .multi_resource(),
        ];

        let selected = select_entry(&entries, CLIENT, "https://files.example.com/", AUTHORITY);
        assert_eq!(selected, None);
    }

    #[test]
    fn empty_cache_matches_nothing() {
        assert_eq!(select_entry(&[], CLIENT, "r", AUTHORITY), None);
    }

    #[tokio::test]
    async fn memory_cache_read_entries() {
        let cache = MemoryTokenCache::new();
        cache.push(CacheEntry::new(CLIENT, "r", AUTHORITY).with_user_id("a@b.com"));

        let entries = cache.read_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id.as_deref(), Some("a@b.com"));
    }
}

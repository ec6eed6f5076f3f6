//! File/env-backed collaborators for the demo CLI.
//!
//! [`StaticCredentials`] plays both collaborator roles the core expects:
//! it surfaces the config's token table as cache entries and answers
//! silent acquisitions from the same table, with `WAYPOST_<RESOURCE>_TOKEN`
//! environment variables taking precedence for a configured resource.
//! Interactive token acquisition is not available in the demo.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;
use waypost_core::{AuthError, Authenticator, CacheEntry, CacheError, TokenCache, TokenResult};

const ENV_PREFIX: &str = "WAYPOST";

pub struct StaticCredentials {
    client_id: String,
    authority: String,
    tokens: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new(
        client_id: impl Into<String>,
        authority: impl Into<String>,
        tokens: HashMap<String, String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            authority: authority.into(),
            tokens,
        }
    }

    /// Environment variable consulted for `resource`, e.g.
    /// `WAYPOST_EXAMPLE_DISCOVERY_TOKEN` for `Example.Discovery`.
    fn env_var_name(resource: &str) -> String {
        let sanitized: String = resource
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{ENV_PREFIX}_{sanitized}_TOKEN")
    }

    fn lookup(&self, resource: &str) -> Option<String> {
        let env_var = Self::env_var_name(resource);
        if let Ok(token) = std::env::var(&env_var) {
            debug!(resource, "using token from {env_var}");
            return Some(token);
        }
        self.tokens.get(resource).cloned()
    }
}

#[async_trait]
impl TokenCache for StaticCredentials {
    async fn read_entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        Ok(self
            .tokens
            .keys()
            .map(|resource| CacheEntry::new(&self.client_id, resource, &self.authority))
            .collect())
    }
}

#[async_trait]
impl Authenticator for StaticCredentials {
    async fn acquire_silent(
        &self,
        resource: &str,
        _client_id: &str,
        _user_id: Option<&str>,
    ) -> Result<TokenResult, AuthError> {
        match self.lookup(resource) {
            Some(token) => Ok(TokenResult::new(token)),
            None => Err(AuthError::Failed {
                message: format!("no static token configured for {resource}"),
            }),
        }
    }

    async fn acquire_interactive(
        &self,
        resource: &str,
        _client_id: &str,
        _redirect_uri: &str,
    ) -> Result<TokenResult, AuthError> {
        Err(AuthError::Failed {
            message: format!(
                "interactive acquisition is not available in the demo; \
                 add '{resource}' under [tokens] in the config or set {}",
                Self::env_var_name(resource)
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(tokens: &[(&str, &str)]) -> StaticCredentials {
        StaticCredentials::new(
            "client-1",
            "https://login.example.net/tenant/",
            tokens
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn configured_tokens_become_cache_entries() {
        let credentials = credentials(&[("Example.Discovery", "bearer-one")]);

        let entries = credentials.read_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].client_id, "client-1");
        assert_eq!(entries[0].resource, "Example.Discovery");
        assert!(!entries[0].is_multi_resource_refresh_token);
    }

    #[tokio::test]
    async fn silent_acquisition_answers_from_the_table() {
        let credentials = credentials(&[("Example.Discovery", "bearer-one")]);

        let token = credentials
            .acquire_silent("Example.Discovery", "client-1", None)
            .await
            .unwrap();
        assert_eq!(token.access_token.expose(), "bearer-one");
    }

    #[tokio::test]
    async fn env_var_takes_precedence() {
        // SAFETY: Test-only env var manipulation, no concurrent access
        unsafe { std::env::set_var("WAYPOST_EXAMPLE_OVERRIDE_TOKEN", "from-env") };

        let credentials = credentials(&[("Example.Override", "from-config")]);
        let token = credentials
            .acquire_silent("Example.Override", "client-1", None)
            .await
            .unwrap();
        assert_eq!(token.access_token.expose(), "from-env");

        // SAFETY: Test-only env var manipulation
        unsafe { std::env::remove_var("WAYPOST_EXAMPLE_OVERRIDE_TOKEN") };
    }

    #[tokio::test]
    async fn unknown_resource_fails_silent_acquisition() {
        let credentials = credentials(&[]);

        let err = credentials
            .acquire_silent("Example.Missing", "client-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Failed { .. }));
    }

    #[tokio::test]
    async fn interactive_acquisition_names_the_escape_hatch() {
        let credentials = credentials(&[]);

        let err = credentials
            .acquire_interactive("Example.Files", "client-1", "http://localhost/")
            .await
            .unwrap_err();
        match err {
            AuthError::Failed { message } => {
                assert!(message.contains("WAYPOST_EXAMPLE_FILES_TOKEN"));
            }
            other => panic!("expected a descriptive failure, got {other:?}"),
        }
    }
}

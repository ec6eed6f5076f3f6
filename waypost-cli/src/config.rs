//! CLI configuration handling.

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Discovery endpoint used when the config does not name one.
const DEFAULT_DISCOVERY_URI: &str = "https://api.office.com/discovery/me/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Discovery endpoint, with its trailing slash.
    #[serde(default = "default_discovery_uri")]
    pub discovery_uri: String,

    /// Client (application) id registered with the identity provider.
    pub client_id: String,

    /// Identity-provider endpoint issuing tokens for the account.
    pub authority: String,

    /// Redirect URI observed at the end of an interactive sign-in.
    /// Must be a loopback URI with a bindable port for the sign-in
    /// listener, e.g. `http://localhost:8321/`.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Static bearer tokens by resource id, consulted by the demo's
    /// silent acquisition path.
    #[serde(default)]
    pub tokens: HashMap<String, String>,

    /// Logging level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_discovery_uri() -> String {
    DEFAULT_DISCOVERY_URI.to_string()
}

fn default_redirect_uri() -> String {
    waypost_core::DEFAULT_REDIRECT_URI.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from `path`, or from the platform config dir.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()
            .context("could not determine a config directory for this platform")?,
    };

    if !config_path.exists() {
        bail!(
            "no config file at {:?}; create one with at least client_id and authority",
            config_path
        );
    }

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config from {:?}", config_path))?;
    let config: CliConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config from {:?}", config_path))?;

    Ok(config)
}

/// The default config file location: `<config dir>/waypost.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "waypost").map(|dirs| dirs.config_dir().join("waypost.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_applies_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
            client_id = "client-1"
            authority = "https://login.example.net/tenant/"
            "#,
        )
        .unwrap();

        assert_eq!(config.discovery_uri, DEFAULT_DISCOVERY_URI);
        assert_eq!(config.redirect_uri, waypost_core::DEFAULT_REDIRECT_URI);
        assert_eq!(config.log_level, "info");
        assert!(config.tokens.is_empty());
    }

    #[test]
    fn tokens_table_is_parsed() {
        let config: CliConfig = toml::from_str(
            r#"
            client_id = "client-1"
            authority = "https://login.example.net/tenant/"

            [tokens]
            "Example.Discovery" = "bearer-one"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.tokens.get("Example.Discovery").map(String::as_str),
            Some("bearer-one")
        );
    }

    #[test]
    fn missing_client_id_is_rejected() {
        let result: Result<CliConfig, _> =
            toml::from_str(r#"authority = "https://login.example.net/""#);
        assert!(result.is_err());
    }

    #[test]
    fn loads_config_from_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("waypost.toml");
        std::fs::write(
            &path,
            r#"
            discovery_uri = "https://discovery.example.com/me/"
            client_id = "client-1"
            authority = "https://login.example.net/tenant/"
            redirect_uri = "http://localhost:8321/"

            [tokens]
            "Example.Discovery" = "bearer-one"
            "#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.discovery_uri, "https://discovery.example.com/me/");
        assert_eq!(config.redirect_uri, "http://localhost:8321/");
        assert_eq!(config.tokens.len(), 1);
    }

    #[test]
    fn missing_file_is_a_readable_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("no config file"));
    }
}

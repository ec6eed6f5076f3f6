//! The discovery client.
//!
//! [`DiscoveryClient`] resolves the capability endpoints an authenticated
//! account may talk to, and runs the first-time interactive sign-in that
//! bootstraps an account into the discovery service.
//!
//! # Example
//!
//! ```rust,ignore
//! use waypost_core::{scopes, DiscoveryClient};
//!
//! let capabilities = client.services("Example.Files").await?;
//! let files = waypost_core::find_capability(&capabilities, "MyFiles");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::broker::{InteractiveAuthBroker, SignInError};
use crate::http::{HttpError, Request, RequestExecutor};
use crate::provider::{TokenError, TokenProvider};
use crate::redirect::{encode_component, AuthRedirectPayload};

/// Default redirect URI used when the caller does not configure one.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost/";

/// Scope names the discovery service understands.
pub mod scopes {
    pub const MY_FILES_READ: &str = "MyFiles.Read";
    pub const MY_FILES_WRITE: &str = "MyFiles.Write";
    pub const ALL_SITES_READ: &str = "AllSites.Read";
    pub const ALL_SITES_WRITE: &str = "AllSites.Write";
    pub const ALL_SITES_MANAGE: &str = "AllSites.Manage";
    pub const ALL_SITES_FULL_CONTROL: &str = "AllSites.FullControl";
    pub const MAIL_READ: &str = "Mail.Read";
    pub const MAIL_WRITE: &str = "Mail.Write";
    pub const MAIL_SEND: &str = "Mail.Send";
    pub const CALENDARS_READ: &str = "Calendars.Read";
    pub const CALENDARS_WRITE: &str = "Calendars.Write";
    pub const CONTACTS_READ: &str = "Contacts.Read";
    pub const CONTACTS_WRITE: &str = "Contacts.Write";
    pub const USER_IMPERSONATION: &str = "user_impersonation";
    pub const FULL_ACCESS: &str = "full_access";

    /// Capability name advertised for the personal-files endpoint.
    pub const MY_FILES_CAPABILITY: &str = "MyFiles";
}

/// Error type for capability resolution.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Token acquisition failed; passed through unchanged.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The discovery call itself failed; passed through unchanged.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The discovery response did not have the expected shape.
    #[error("malformed discovery response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One capability endpoint advertised by the discovery service.
///
/// Plain record populated once from a single discovery result; order in
/// the returned list is the response's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Well-known capability name (e.g. `MyFiles`).
    pub capability: String,

    /// Endpoint a client of this capability talks to.
    pub endpoint_uri: String,

    /// Human-readable service name.
    pub name: String,

    /// Resource id to acquire tokens for when calling the endpoint.
    pub resource_id: String,
}

/// Select the capability with a well-known name.
///
/// Absence is a caller-level condition
/// ([`WaypostError::CapabilityNotFound`](crate::error::WaypostError));
/// `services` itself never raises it.
pub fn find_capability<'a>(capabilities: &'a [Capability], name: &str) -> Option<&'a Capability> {
    capabilities.iter().find(|c| c.capability == name)
}

// Wire shape of the discovery response; field names are exact and
// case-sensitive.
#[derive(Debug, Deserialize)]
struct ServicesEnvelope {
    d: ServicesResultSet,
}

#[derive(Debug, Deserialize)]
struct ServicesResultSet {
    results: Vec<RawServiceResult>,
}

#[derive(Debug, Deserialize)]
struct RawServiceResult {
    #[serde(rename = "Capability")]
    capability: String,
    #[serde(rename = "ServiceEndpointUri")]
    service_endpoint_uri: String,
    #[serde(rename = "ServiceName")]
    service_name: String,
    #[serde(rename = "ServiceResourceId")]
    service_resource_id: String,
}

impl From<RawServiceResult> for Capability {
    fn from(raw: RawServiceResult) -> Self {
        Self {
            capability: raw.capability,
            endpoint_uri: raw.service_endpoint_uri,
            name: raw.service_name,
            resource_id: raw.service_resource_id,
        }
    }
}

/// Client for one discovery endpoint.
///
/// The discovery URI is expected to carry its trailing slash
/// (e.g. `https://discovery.example.com/me/`).
pub struct DiscoveryClient {
    discovery_uri: String,
    redirect_uri: String,
    provider: TokenProvider,
    broker: InteractiveAuthBroker,
    executor: RequestExecutor,
}

impl DiscoveryClient {
    /// Create a client for `discovery_uri` over the given token provider
    /// and sign-in broker.
    pub fn new(
        discovery_uri: impl Into<String>,
        provider: TokenProvider,
        broker: InteractiveAuthBroker,
    ) -> Self {
        Self {
            discovery_uri: discovery_uri.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            provider,
            broker,
            executor: RequestExecutor::new(),
        }
    }

    /// Override the default redirect URI used by `first_sign_in`.
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    /// Override the request executor (e.g. to share an HTTP client).
    pub fn with_executor(mut self, executor: RequestExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Resolve the capability endpoints available for `resource_id`.
    ///
    /// Obtains a bearer token through the provider's fallback chain, calls
    /// `<discovery_uri>/services`, and maps each result record to one
    /// [`Capability`], preserving response order. Token and transport
    /// failures propagate unchanged.
    pub async fn services(&self, resource_id: &str) -> Result<Vec<Capability>, DiscoveryError> {
        let token = self.provider.acquire_token(resource_id).await?;

        let request = Request::get(format!("{}/services", self.discovery_uri))
            .header("Accept", "application/json;odata=verbose")
            .header(
                "Authorization",
                format!("Bearer {}", token.access_token.expose()),
            );

        let body = self.executor.send(request).await?;
        let envelope: ServicesEnvelope = serde_json::from_str(&body)?;

        let capabilities: Vec<Capability> =
            envelope.d.results.into_iter().map(Capability::from).collect();
        debug!(resource_id, count = capabilities.len(), "resolved capabilities");

        Ok(capabilities)
    }

    /// Run the first-time interactive sign-in for `scopes`.
    ///
    /// Delegates the round trip to the broker and returns its parsed
    /// payload or failure unchanged. `redirect_uri` defaults to the
    /// client's configured one.
    pub async fn first_sign_in(
        &self,
        scopes: &str,
        redirect_uri: Option<&str>,
    ) -> Result<AuthRedirectPayload, SignInError> {
        let redirect_uri = redirect_uri.unwrap_or(&self.redirect_uri);
        let authorization_uri = format!(
            "{}FirstSignIn?scope={}&redirect_uri={}",
            self.discovery_uri,
            scopes,
            encode_component(redirect_uri)
        );

        self.broker.authorize(&authorization_uri, redirect_uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capability(name: &str) -> Capability {
        Capability {
            capability: name.to_string(),
            endpoint_uri: format!("https://{name}.example.com/api"),
            name: format!("{name} service"),
            resource_id: format!("Example.{name}"),
        }
    }

    #[test]
    fn find_capability_by_well_known_name() {
        let capabilities = vec![capability("RootSite"), capability("MyFiles")];

        let found = find_capability(&capabilities, scopes::MY_FILES_CAPABILITY).unwrap();
        assert_eq!(found.endpoint_uri, "https://MyFiles.example.com/api");
        assert!(find_capability(&capabilities, "Mail").is_none());
    }

    #[test]
    fn envelope_parses_exact_field_names() {
        let body = r#"{
            "d": {
                "results": [
                    {
                        "Capability": "MyFiles",
                        "ServiceEndpointUri": "https://files.example.com/_api",
                        "ServiceName": "Files",
                        "ServiceResourceId": "Example.Files"
                    }
                ]
            }
        }"#;

        let envelope: ServicesEnvelope = serde_json::from_str(body).unwrap();
        let cap = Capability::from(envelope.d.results.into_iter().next().unwrap());
        assert_eq!(cap.capability, "MyFiles");
        assert_eq!(cap.endpoint_uri, "https://files.example.com/_api");
        assert_eq!(cap.name, "Files");
        assert_eq!(cap.resource_id, "Example.Files");
    }

    #[test]
    fn lowercase_field_names_are_rejected() {
        let body = r#"{"d": {"results": [{"capability": "MyFiles"}]}}"#;
        assert!(serde_json::from_str::<ServicesEnvelope>(body).is_err());
    }
}

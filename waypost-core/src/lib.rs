//! # Waypost Core
//!
//! Core library for Waypost authenticated service discovery.
//!
//! This crate provides:
//! - The cache-first token acquisition chain ([`TokenProvider`])
//! - The interactive first-sign-in round trip ([`InteractiveAuthBroker`]),
//!   platform-branched between a native broker and a popup/redirect
//!   listener
//! - The discovery client resolving capability endpoints
//!   ([`DiscoveryClient`])
//! - The authenticated-request executor ([`RequestExecutor`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use waypost_core::{DiscoveryClient, InteractiveAuthBroker, TokenProvider};
//!
//! async fn list_endpoints(client: &DiscoveryClient) -> Result<(), waypost_core::DiscoveryError> {
//!     for capability in client.services("Example.Files").await? {
//!         println!("{} -> {}", capability.capability, capability.endpoint_uri);
//!     }
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod cache;
pub mod discovery;
pub mod error;
pub mod host;
pub mod http;
pub mod provider;
pub mod redirect;
pub mod token;

// Re-export commonly used types at crate root
pub use broker::{
    BrokerResponse,
    HostEnvironment,
    InteractiveAuthBroker,
    NativeBroker,
    PopupSurface,
    PopupWindow,
    SignInError,
    SignInStrategy,
};

pub use cache::{
    select_entry,
    CacheEntry,
    CacheError,
    MemoryTokenCache,
    TokenCache,
};

pub use discovery::{
    find_capability,
    scopes,
    Capability,
    DiscoveryClient,
    DiscoveryError,
    DEFAULT_REDIRECT_URI,
};

pub use error::WaypostError;

pub use host::LoopbackSurface;

pub use http::{
    HttpError,
    ReadinessStage,
    Request,
    RequestExecutor,
};

pub use provider::{TokenError, TokenProvider};

pub use redirect::{
    query_parameter,
    AccountType,
    AuthRedirectPayload,
};

pub use token::{
    AccessToken,
    AuthError,
    Authenticator,
    TokenResult,
};

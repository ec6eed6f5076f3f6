//! The interactive sign-in round trip.
//!
//! [`InteractiveAuthBroker`] drives one interactive authorization request
//! and captures the terminal redirect. Two mutually exclusive strategies
//! exist, selected once at construction from the host's capabilities:
//!
//! - **Native**: the host exposes an interactive-authentication broker
//!   ([`NativeBroker`]) that runs the whole round trip and hands back the
//!   final response URL.
//! - **Popup**: the host can open a top-level window ([`PopupSurface`])
//!   whose navigation events are watched until one lands on the
//!   configured redirect URI.
//!
//! Either way the terminal URL goes through the same parsing step, one
//! scheduling tick removed from the navigation callback that produced it.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::redirect::AuthRedirectPayload;

/// Error type for the interactive sign-in flow.
#[derive(Debug, Error)]
pub enum SignInError {
    /// The user closed the sign-in dialog or window.
    #[error("the sign-in dialog was closed by the user")]
    Cancelled,

    /// No window could be opened for the authorization request.
    #[error("the sign-in window was blocked")]
    PopupBlocked,

    /// The native broker reported a non-cancel failure.
    #[error("authentication broker failure: {detail}")]
    Broker { detail: String },
}

/// Outcome reported by a native authentication broker.
#[derive(Debug, Clone)]
pub enum BrokerResponse {
    /// The round trip completed; `response_url` is the terminal redirect.
    Success { response_url: String },
    /// The user dismissed the broker's dialog.
    UserCancel,
    /// Anything else the broker can report, flattened to a description.
    Failure { detail: String },
}

/// A host-provided interactive-authentication broker.
#[async_trait::async_trait]
pub trait NativeBroker: Send + Sync {
    /// Run one authorization round trip from `authorization_uri` until the
    /// broker observes `redirect_uri`.
    async fn authenticate(&self, authorization_uri: &str, redirect_uri: &str) -> BrokerResponse;
}

/// A top-level window opened for an authorization request.
///
/// The host surface owns the actual window; this handle carries its
/// navigation events and a way to close it.
pub struct PopupWindow {
    navigations: mpsc::UnboundedReceiver<String>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl PopupWindow {
    /// Wrap a stream of navigation-event URLs.
    pub fn new(navigations: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            navigations,
            on_close: None,
        }
    }

    /// Attach the close action for the underlying window.
    pub fn with_close(mut self, close: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(close));
        self
    }

    pub(crate) async fn next_navigation(&mut self) -> Option<String> {
        self.navigations.recv().await
    }

    fn close(&mut self) {
        if let Some(close) = self.on_close.take() {
            close();
        }
    }
}

impl Drop for PopupWindow {
    fn drop(&mut self) {
        self.close();
    }
}

/// A host capability that can open top-level windows.
#[async_trait::async_trait]
pub trait PopupSurface: Send + Sync {
    /// Open a window at `uri`.
    ///
    /// `None` means the window could not be opened (blocked); no listener
    /// is attached in that case.
    async fn open(&self, uri: &str) -> Option<PopupWindow>;
}

/// Host capability query used to pick a strategy at construction time.
pub trait HostEnvironment: Send + Sync {
    /// The native interactive-authentication broker, when the platform has
    /// one.
    fn native_broker(&self) -> Option<Arc<dyn NativeBroker>>;

    /// The window-opening surface used when no native broker exists.
    fn popup_surface(&self) -> Arc<dyn PopupSurface>;
}

/// How an interactive sign-in is executed on this host.
#[derive(Clone)]
pub enum SignInStrategy {
    /// Delegate the whole round trip to a native broker.
    Native(Arc<dyn NativeBroker>),
    /// Open a window and watch its navigations for the redirect.
    Popup(Arc<dyn PopupSurface>),
}

impl SignInStrategy {
    /// Resolve the strategy from the host's capabilities: a native broker
    /// when present, the popup surface otherwise.
    pub fn detect(host: &dyn HostEnvironment) -> Self {
        match host.native_broker() {
            Some(broker) => Self::Native(broker),
            None => Self::Popup(host.popup_surface()),
        }
    }
}

/// Returns whether `url` starts with `redirect_uri`, compared
/// case-insensitively.
fn is_terminal_redirect(url: &str, redirect_uri: &str) -> bool {
    url.len() >= redirect_uri.len()
        && url.as_bytes()[..redirect_uri.len()].eq_ignore_ascii_case(redirect_uri.as_bytes())
}

/// Drives interactive authorization round trips.
///
/// One broker serves one authentication context; attempts through the
/// same broker are serialized so that only a single redirect listener is
/// ever live. There are no retries and no timeouts: a window that never
/// navigates to the redirect suspends its caller until abandoned.
pub struct InteractiveAuthBroker {
    strategy: SignInStrategy,
    in_flight: Mutex<()>,
}

impl InteractiveAuthBroker {
    /// Create a broker with an explicit strategy.
    pub fn new(strategy: SignInStrategy) -> Self {
        Self {
            strategy,
            in_flight: Mutex::new(()),
        }
    }

    /// Create a broker with the strategy the host's capabilities select.
    pub fn from_host(host: &dyn HostEnvironment) -> Self {
        Self::new(SignInStrategy::detect(host))
    }

    /// Run one authorization round trip and parse the terminal redirect.
    pub async fn authorize(
        &self,
        authorization_uri: &str,
        redirect_uri: &str,
    ) -> Result<AuthRedirectPayload, SignInError> {
        let _guard = self.in_flight.lock().await;

        match &self.strategy {
            SignInStrategy::Native(broker) => {
                debug!(authorization_uri, "starting native broker sign-in");
                match broker.authenticate(authorization_uri, redirect_uri).await {
                    BrokerResponse::Success { response_url } => {
                        if !is_terminal_redirect(&response_url, redirect_uri) {
                            return Err(SignInError::Broker {
                                detail: format!(
                                    "broker returned a response outside the redirect uri: {response_url}"
                                ),
                            });
                        }
                        complete(&response_url).await
                    }
                    BrokerResponse::UserCancel => Err(SignInError::Cancelled),
                    BrokerResponse::Failure { detail } => Err(SignInError::Broker { detail }),
                }
            }
            SignInStrategy::Popup(surface) => {
                debug!(authorization_uri, "starting popup sign-in");
                let mut window = surface
                    .open(authorization_uri)
                    .await
                    .ok_or(SignInError::PopupBlocked)?;

                while let Some(url) = window.next_navigation().await {
                    if is_terminal_redirect(&url, redirect_uri) {
                        window.close();
                        return complete(&url).await;
                    }
                    debug!(%url, "ignoring intermediate navigation");
                }

                // The navigation source went away before reaching the
                // redirect: the window was dismissed.
                Err(SignInError::Cancelled)
            }
        }
    }
}

/// Shared terminal step: parse the redirect one scheduling tick removed
/// from the navigation callback that detected it.
async fn complete(response_url: &str) -> Result<AuthRedirectPayload, SignInError> {
    tokio::task::yield_now().await;
    Ok(AuthRedirectPayload::from_redirect_url(response_url))
}

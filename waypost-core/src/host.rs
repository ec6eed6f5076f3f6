//! Loopback popup surface for hosts without a native broker.
//!
//! [`LoopbackSurface`] implements the window-opening primitive with a TCP
//! listener on the configured loopback redirect URI: the "window" is
//! whatever browser the user points at the announced authorization URI,
//! and every HTTP request hitting the listener becomes one navigation
//! event. A bind failure is reported as a blocked window.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;
use url::Url;

use crate::broker::{PopupSurface, PopupWindow};

const SIGNED_IN_PAGE: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n\
    <html><body><h1>Sign-in complete</h1>\
    <p>You can close this window and return to your application.</p></body></html>";

const BAD_REQUEST_PAGE: &[u8] = b"HTTP/1.1 400 Bad Request\r\n\r\n\
    <html><body><h1>Bad Request</h1></body></html>";

/// Popup surface backed by a loopback redirect listener.
pub struct LoopbackSurface {
    redirect_uri: Url,
    announce: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

impl LoopbackSurface {
    /// Create a surface for a loopback `redirect_uri`
    /// (e.g. `http://localhost:8321/`).
    pub fn new(redirect_uri: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            redirect_uri: Url::parse(redirect_uri)?,
            announce: None,
        })
    }

    /// Attach a callback invoked with the authorization URI once the
    /// listener is up, so the host can show it to the user.
    pub fn with_announcer(mut self, announce: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.announce = Some(Box::new(announce));
        self
    }

    /// The origin prefix navigation URLs are reconstructed under.
    fn origin(&self) -> Option<String> {
        let host = self.redirect_uri.host_str()?;
        let port = match self.redirect_uri.port() {
            Some(port) => format!(":{port}"),
            None => String::new(),
        };
        Some(format!("{}://{host}{port}", self.redirect_uri.scheme()))
    }
}

#[async_trait]
impl PopupSurface for LoopbackSurface {
    async fn open(&self, uri: &str) -> Option<PopupWindow> {
        let origin = self.origin()?;
        let port = self.redirect_uri.port_or_known_default()?;

        let listener = TcpListener::bind(("127.0.0.1", port)).await.ok()?;

        if let Some(announce) = &self.announce {
            announce(uri);
        }
        info!(
            authorization_uri = uri,
            "waiting for the sign-in redirect on 127.0.0.1:{port}"
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let accept_loop = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };

                let mut buffer = [0u8; 4096];
                let Ok(n) = socket.read(&mut buffer).await else {
                    continue;
                };
                let request = String::from_utf8_lossy(&buffer[..n]);

                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1));
                let Some(path) = path else {
                    let _ = socket.write_all(BAD_REQUEST_PAGE).await;
                    continue;
                };

                let _ = socket.write_all(SIGNED_IN_PAGE).await;
                if events_tx.send(format!("{origin}{path}")).is_err() {
                    break;
                }
            }
        });

        Some(PopupWindow::new(events_rx).with_close(move || accept_loop.abort()))
    }
}

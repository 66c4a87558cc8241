//! Puppet Enterprise client.
//!
//! Currently only supports sending events to a URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::RestError;
use crate::event::PeEvent;
use crate::rest::RestClient;

/// Header carrying a Puppet Enterprise RBAC token.
pub const TOKEN_HEADER: &str = "X-Authentication";

/// How the client authenticates against Puppet Enterprise.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Basic base64(username:password)`
    Basic { username: String, password: String },
    /// RBAC token sent in the `X-Authentication` header
    Token(String),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"***").finish(),
        }
    }
}

impl Credentials {
    fn header(&self) -> Result<(HeaderName, HeaderValue), RestError> {
        match self {
            Self::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
                    .map_err(|_| RestError::InvalidHeader(AUTHORIZATION.to_string()))?;
                value.set_sensitive(true);
                Ok((AUTHORIZATION, value))
            }
            Self::Token(token) => {
                let mut value = HeaderValue::from_str(token)
                    .map_err(|_| RestError::InvalidHeader(TOKEN_HEADER.to_string()))?;
                value.set_sensitive(true);
                Ok((HeaderName::from_static("x-authentication"), value))
            }
        }
    }
}

/// Client used to post events to Puppet Enterprise.
#[derive(Debug, Clone)]
pub struct PeClient {
    rest: RestClient,
    headers: HeaderMap,
    force_https: bool,
}

impl Default for PeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PeClient {
    /// Create a client with `Content-Type: application/json` and HTTPS
    /// enforcement enabled.
    #[must_use]
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            rest: RestClient::new(),
            headers,
            force_https: true,
        }
    }

    /// Allow or forbid plain `http://` endpoints.
    #[must_use]
    pub const fn with_force_https(mut self, force_https: bool) -> Self {
        self.force_https = force_https;
        self
    }

    /// Attach credentials to every subsequent request.
    ///
    /// Credentials that cannot be encoded as a header are logged and ignored;
    /// the remote end will then reject the request.
    pub fn add_credentials(&mut self, credentials: Credentials) {
        info!(credentials = ?credentials, "action=ADD_CREDENTIALS");
        match credentials.header() {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(e) => warn!(error = %e, "Unable to encode credentials"),
        }
    }

    /// Add a header to every request that goes through the client.
    ///
    /// # Errors
    /// Returns error if the name or value is not a valid HTTP header.
    pub fn add_header(&mut self, key: &str, value: &str) -> Result<(), RestError> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| RestError::InvalidHeader(key.to_string()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| RestError::InvalidHeader(key.to_string()))?;
        self.headers.insert(name, value);
        Ok(())
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Send an event and return the `requestId` from the response.
    ///
    /// Any failure (transport, status, body, missing `requestId`) is logged and
    /// reported as `None`.
    pub async fn send_event(&self, url: &str, event: &PeEvent) -> Option<String> {
        info!(url = %url, "action=SEND_EVENT");
        match self.try_send_event(url, event).await {
            Ok(request_id) => {
                debug!(request_id = %request_id, "Puppet Enterprise accepted event");
                Some(request_id)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to send event to Puppet Enterprise");
                None
            }
        }
    }

    async fn try_send_event(&self, url: &str, event: &PeEvent) -> Result<String, RestError> {
        let body = event.to_json().map_err(|source| RestError::Decode {
            url: url.to_string(),
            source,
        })?;

        let response = self
            .rest
            .post(url, &self.headers, body, self.force_https)
            .await?;

        match response.get("requestId") {
            Some(Value::String(id)) => Ok(id.clone()),
            _ => Err(RestError::MissingField("requestId")),
        }
    }
}

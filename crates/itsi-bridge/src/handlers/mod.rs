//! Request handlers for ITSI notable-event actions.
//!
//! A handler receives the request envelope splunkd forwards (method, payload,
//! session, server) and produces a status code plus JSON payload. The shared
//! [`handle`] pipeline validates the method and required payload fields,
//! connects to the platform, and turns unexpected failures into a generic 400.

pub mod comment;
pub mod response;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::HandlerError;
use crate::platform::{Platform, PlatformConnector};
use crate::Record;

pub use comment::CommentHandler;
pub use response::{ResponseAction, ResponseConfig, ResponseHandler};

/// Payload message for failures that have no more specific response.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Status code and JSON body returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    pub payload: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, payload: Value) -> Self {
        info!(status, payload = %payload, "Handler response");
        Self { status, payload }
    }

    /// The generic 400 for unexpected failures.
    #[must_use]
    pub fn unknown_error() -> Self {
        Self::new(400, json!({ "message": UNKNOWN_ERROR_MESSAGE }))
    }
}

/// Request data a handler needs beyond the payload.
pub struct RequestContext {
    /// Platform opened with the request's session
    pub platform: Arc<dyn Platform>,
}

/// A persistent-connection request handler.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Short name used in logs and routes.
    fn name(&self) -> &'static str;

    fn valid_methods(&self) -> &'static [&'static str] {
        &["POST"]
    }

    /// Payload fields that must be present and non-null.
    fn required_fields(&self) -> &'static [&'static str];

    /// Extra validation after the required-field check. A returned body is
    /// sent back as a 400.
    async fn validate_request(&self, _payload: &Record, _ctx: &RequestContext) -> Option<Value> {
        None
    }

    async fn process_request(
        &self,
        payload: &Record,
        ctx: &RequestContext,
    ) -> Result<HandlerResponse, HandlerError>;
}

#[derive(Debug, Deserialize)]
struct RequestEnvelope {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    session: Option<SessionInfo>,
    #[serde(default)]
    server: Option<ServerInfo>,
}

#[derive(Deserialize)]
struct SessionInfo {
    authtoken: String,
}

impl std::fmt::Debug for SessionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionInfo")
            .field("authtoken", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ServerInfo {
    rest_uri: String,
}

/// Required fields that are absent or null in `payload`, in declaration order.
#[must_use]
pub fn missing_fields(required: &[&'static str], payload: &Record) -> Vec<&'static str> {
    required
        .iter()
        .copied()
        .filter(|key| payload.get(*key).filter(|v| !v.is_null()).is_none())
        .collect()
}

/// A string payload field; `Ok(None)` when absent or null.
pub(crate) fn text_field<'a>(
    payload: &'a Record,
    key: &'static str,
) -> Result<Option<&'a str>, HandlerError> {
    match payload.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(HandlerError::InvalidField(key)),
    }
}

/// A required string payload field.
pub(crate) fn required_text<'a>(
    payload: &'a Record,
    key: &'static str,
) -> Result<&'a str, HandlerError> {
    text_field(payload, key)?.ok_or(HandlerError::InvalidField(key))
}

/// The optional `children` event-id list, for logging.
pub(crate) fn children(payload: &Record) -> Vec<&str> {
    payload
        .get("children")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Run one request envelope through `handler`.
pub async fn handle(
    handler: &dyn RequestHandler,
    connector: &dyn PlatformConnector,
    input: &str,
) -> HandlerResponse {
    match try_handle(handler, connector, input).await {
        Ok(response) => response,
        Err(e) => {
            error!(handler = handler.name(), error = %e, "{UNKNOWN_ERROR_MESSAGE}");
            HandlerResponse::unknown_error()
        }
    }
}

async fn try_handle(
    handler: &dyn RequestHandler,
    connector: &dyn PlatformConnector,
    input: &str,
) -> Result<HandlerResponse, HandlerError> {
    let envelope: RequestEnvelope = serde_json::from_str(input)?;
    debug!(handler = handler.name(), envelope = ?envelope, "Handling request");
    let method = envelope.method.unwrap_or_default();

    if !handler.valid_methods().contains(&method.as_str()) {
        return Ok(HandlerResponse::new(
            405,
            Value::String(format!(
                "METHOD= {method} SUPPORTED_METHODS= {}",
                handler.valid_methods().join(",")
            )),
        ));
    }

    let payload = match envelope.payload {
        Value::String(raw) => serde_json::from_str::<Value>(&raw)?,
        other => other,
    };
    let Value::Object(payload) = payload else {
        return Err(HandlerError::Envelope("payload is not an object".to_string()));
    };

    let missing = missing_fields(handler.required_fields(), &payload);
    if !missing.is_empty() {
        return Ok(HandlerResponse::new(
            400,
            json!({
                "error_code": "INVALID_REQUEST",
                "error_message": "Missing Required Fields",
                "missing_fields": missing,
            }),
        ));
    }

    let session_key = envelope
        .session
        .ok_or_else(|| HandlerError::Envelope("missing session.authtoken".to_string()))?
        .authtoken;
    let server_rest_uri = envelope
        .server
        .ok_or_else(|| HandlerError::Envelope("missing server.rest_uri".to_string()))?
        .rest_uri;

    let ctx = RequestContext {
        platform: connector.connect(&server_rest_uri, &session_key)?,
    };

    if let Some(body) = handler.validate_request(&payload, &ctx).await {
        return Ok(HandlerResponse::new(400, body));
    }

    handler.process_request(&payload, &ctx).await
}

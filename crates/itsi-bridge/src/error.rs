//! Error types for the ITSI bridge.

use pe_sdk::{PriorityError, RestError};
use thiserror::Error;

/// Failures talking to the Splunk/ITSI REST API.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error(transparent)]
    Rest(#[from] RestError),

    /// The call succeeded but the body did not have the expected shape
    #[error("Unexpected response from {endpoint}: missing {field}")]
    UnexpectedResponse {
        endpoint: &'static str,
        field: &'static str,
    },

    #[error("Invalid server URI: {0}")]
    InvalidUri(String),

    #[error("Invalid session key")]
    InvalidSessionKey,

    #[error("Server URI is not the configured splunkd: {0}")]
    UntrustedServer(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An item of the grouped-event sequence that is not a usable event.
#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("Failed to fetch grouped events: {0}")]
    Fetch(#[from] PlatformError),

    #[error("Grouped event is not an object: {0}")]
    Malformed(String),
}

/// Errors raised while running the alert action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Missing correlation event_id")]
    MissingCorrelationId,

    #[error("Error getting password: {name}")]
    Password {
        name: String,
        #[source]
        source: PlatformError,
    },

    #[error(transparent)]
    EventSource(#[from] EventSourceError),

    /// Invalid alert configuration. The action absorbs these.
    #[error(transparent)]
    Validation(#[from] PriorityError),

    #[error("Failed to execute one or more send event actions.")]
    SendFailed,

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl ActionError {
    /// Whether this is a configuration validation failure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Errors decoding alert-action settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid alert settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing setting: {0}")]
    Missing(&'static str),
}

/// Errors that turn into the generic 400 response of a request handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid request envelope: {0}")]
    Envelope(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Field {0} must be a string")]
    InvalidField(&'static str),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

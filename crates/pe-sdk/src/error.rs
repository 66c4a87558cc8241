//! Error types for the Puppet Enterprise SDK.

use thiserror::Error;

/// Errors that can occur while talking to a REST endpoint.
#[derive(Debug, Error)]
pub enum RestError {
    /// Transport-level failure (connect, TLS, read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body was not valid JSON
    #[error("Invalid JSON response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A header name or value could not be encoded
    #[error("Invalid header {0}")]
    InvalidHeader(String),

    /// The response decoded but lacked an expected field
    #[error("Response missing field: {0}")]
    MissingField(&'static str),
}

/// Raised when a priority is not one of `HIGH`, `MEDIUM`, `LOW`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("error=PUPPETENTERPRISE_INVALID_PRIORITY value={value} valid_priorities={valid}")]
pub struct PriorityError {
    /// The upper-cased value that failed to match
    pub value: String,
    /// `;`-joined list of accepted priorities
    pub valid: String,
}

//! Thin JSON REST client shared by the Puppet Enterprise client and the
//! Splunk platform lookups.

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RestError;

/// JSON-over-HTTP client.
///
/// Every call returns the decoded response body, or a [`RestError`] when the
/// request did not succeed. An empty success body decodes to [`Value::Null`].
#[derive(Debug, Clone, Default)]
pub struct RestClient {
    client: reqwest::Client,
}

impl RestClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Issue a GET request.
    ///
    /// # Errors
    /// Returns error on transport failure, non-success status or invalid JSON.
    pub async fn get(&self, url: &str, headers: &HeaderMap) -> Result<Value, RestError> {
        self.request(Method::GET, url, headers, None).await
    }

    /// Issue a POST request with a pre-serialized body.
    ///
    /// With `force_https` set, a plain `http://` URL is upgraded to `https://`.
    ///
    /// # Errors
    /// Returns error on transport failure, non-success status or invalid JSON.
    pub async fn post(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: String,
        force_https: bool,
    ) -> Result<Value, RestError> {
        let url = if force_https {
            upgrade_to_https(url)
        } else {
            url.to_string()
        };
        self.request(Method::POST, &url, headers, Some(body)).await
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<String>,
    ) -> Result<Value, RestError> {
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.client.request(method.clone(), url).headers(headers.clone());
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.inspect_err(|e| {
            warn!(method = %method, url = %url, error = %e, "Request failed");
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                method = %method,
                url = %url,
                status = %status,
                body = %text,
                "Request returned error status"
            );
            return Err(RestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|source| {
            warn!(url = %url, error = %source, "Response body is not JSON");
            RestError::Decode {
                url: url.to_string(),
                source,
            }
        })
    }
}

/// Rewrite a plain `http://` URL to `https://`. Other URLs are returned as-is.
#[must_use]
pub fn upgrade_to_https(url: &str) -> String {
    match url.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("http://") => {
            format!("https://{}", &url[7..])
        }
        _ => url.to_string(),
    }
}

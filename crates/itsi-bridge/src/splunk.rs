//! Splunk/ITSI REST implementation of [`Platform`].

use async_trait::async_trait;
use pe_sdk::RestClient;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{EventSourceError, PlatformError};
use crate::platform::{EventUpdate, Platform, PlatformConnector};
use crate::Record;

/// ITSI event management REST namespace.
const EVENT_MANAGEMENT_PATH: &str = "servicesNS/nobody/SA-ITOA/event_management_interface";

/// Talks to one splunkd management endpoint with one session key.
#[derive(Debug, Clone)]
pub struct SplunkPlatform {
    rest: RestClient,
    server_uri: String,
    headers: HeaderMap,
}

impl SplunkPlatform {
    /// # Errors
    /// Returns error if the session key cannot be sent as a header.
    pub fn new(rest: RestClient, server_uri: &str, session_key: &str) -> Result<Self, PlatformError> {
        let mut auth = HeaderValue::from_str(&format!("Splunk {session_key}"))
            .map_err(|_| PlatformError::InvalidSessionKey)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            rest,
            server_uri: server_uri.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, PlatformError> {
        let mut url =
            Url::parse(&self.server_uri).map_err(|_| PlatformError::InvalidUri(self.server_uri.clone()))?;
        url.path_segments_mut()
            .map_err(|()| PlatformError::InvalidUri(self.server_uri.clone()))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("output_mode", "json")
            .extend_pairs(query);
        Ok(url)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, PlatformError> {
        Ok(self
            .rest
            .post(url, &self.headers, body.to_string(), false)
            .await?)
    }
}

/// `entry[0].content.<field>` of a splunkd response.
fn entry_content<'a>(
    body: &'a Value,
    endpoint: &'static str,
    field: &'static str,
) -> Result<&'a Value, PlatformError> {
    body.get("entry")
        .and_then(|entry| entry.get(0))
        .and_then(|entry| entry.get("content"))
        .and_then(|content| content.get(field))
        .ok_or(PlatformError::UnexpectedResponse { endpoint, field })
}

#[async_trait]
impl Platform for SplunkPlatform {
    async fn create_comment(&self, event_id: &str, comment: &str) -> Result<(), PlatformError> {
        info!(event_id = %event_id, "action=CREATE_COMMENT");
        let url = format!("{}/{EVENT_MANAGEMENT_PATH}/notable_event_comment", self.server_uri);
        self.post_json(&url, &json!({ "event_id": event_id, "comment": comment }))
            .await?;
        Ok(())
    }

    async fn update_events(&self, update: &EventUpdate) -> Result<(), PlatformError> {
        info!(
            event_ids = %update.event_ids.join(","),
            status = ?update.status,
            owner = ?update.owner,
            "action=UPDATE_EVENTS"
        );
        let url = format!(
            "{}/{EVENT_MANAGEMENT_PATH}/notable_event/bulk_update",
            self.server_uri
        );
        self.post_json(&url, &serde_json::to_value(update)?).await?;
        Ok(())
    }

    async fn user_roles(&self, username: &str) -> Result<Vec<String>, PlatformError> {
        let url = self.url(&["services", "authentication", "users", username], &[])?;
        debug!(request_url = %url, "action=GET_USER");

        let body = self.rest.get(url.as_str(), &self.headers).await?;
        let roles = entry_content(&body, "authentication/users", "roles")?;
        roles
            .as_array()
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .ok_or(PlatformError::UnexpectedResponse {
                endpoint: "authentication/users",
                field: "roles",
            })
    }

    async fn app_version(&self, app: &str) -> Result<String, PlatformError> {
        let url = self.url(&["services", "apps", "local", app], &[])?;
        debug!(request_url = %url, "action=GET_APP");

        let body = self.rest.get(url.as_str(), &self.headers).await?;
        entry_content(&body, "apps/local", "version")?
            .as_str()
            .map(str::to_string)
            .ok_or(PlatformError::UnexpectedResponse {
                endpoint: "apps/local",
                field: "version",
            })
    }

    async fn stored_password(&self, app: &str, name: &str) -> Result<String, PlatformError> {
        info!(password_name = %name, "action=GET_PASSWORD");
        let url = format!(
            "{}/servicesNS/nobody/{app}/storage/passwords/%3A{name}%3A?output_mode=json",
            self.server_uri
        );

        let body = self.rest.get(&url, &self.headers).await?;
        entry_content(&body, "storage/passwords", "clear_password")?
            .as_str()
            .map(str::to_string)
            .ok_or(PlatformError::UnexpectedResponse {
                endpoint: "storage/passwords",
                field: "clear_password",
            })
    }

    async fn grouped_events(&self, group_id: &str) -> Vec<Result<Record, EventSourceError>> {
        let filter = json!({ "itsi_group_id": group_id }).to_string();
        let url = match self.url(
            &[
                "servicesNS",
                "nobody",
                "SA-ITOA",
                "event_management_interface",
                "notable_event",
            ],
            &[("filter", filter.as_str())],
        ) {
            Ok(url) => url,
            Err(e) => return vec![Err(e.into())],
        };
        debug!(group_id = %group_id, request_url = %url, "action=GET_GROUPED_EVENTS");

        match self.rest.get(url.as_str(), &self.headers).await {
            Ok(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(EventSourceError::Malformed(other.to_string())),
                })
                .collect(),
            Ok(other) => vec![Err(EventSourceError::Malformed(other.to_string()))],
            Err(e) => vec![Err(PlatformError::from(e).into())],
        }
    }
}

/// Builds [`SplunkPlatform`]s that share one HTTP client.
#[derive(Debug, Clone, Default)]
pub struct SplunkConnector {
    rest: RestClient,
}

impl SplunkConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlatformConnector for SplunkConnector {
    fn connect(
        &self,
        server_uri: &str,
        session_key: &str,
    ) -> Result<Arc<dyn Platform>, PlatformError> {
        Ok(Arc::new(SplunkPlatform::new(
            self.rest.clone(),
            server_uri,
            session_key,
        )?))
    }
}

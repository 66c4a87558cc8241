//! In-memory `Platform` that records every write.

#![allow(dead_code)]

use async_trait::async_trait;
use itsi_bridge::error::{EventSourceError, PlatformError};
use itsi_bridge::{EventUpdate, Platform, PlatformConnector, Record};
use pe_sdk::RestError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakePlatform {
    pub comments: Mutex<Vec<(String, String)>>,
    pub updates: Mutex<Vec<EventUpdate>>,
    pub roles: HashMap<String, Vec<String>>,
    pub version: Option<String>,
    pub password: Option<String>,
    pub children: Vec<Result<Record, String>>,
    pub fail_updates: bool,
    pub requested_groups: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn with_version(version: &str) -> Self {
        Self {
            version: Some(version.to_string()),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, name: &str, roles: &[&str]) -> Self {
        self.roles.insert(
            name.to_string(),
            roles.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn with_children(mut self, children: Vec<Value>) -> Self {
        self.children = children
            .into_iter()
            .map(|child| Ok(child.as_object().cloned().unwrap()))
            .collect();
        self
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<EventUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

fn not_found(url: &str) -> PlatformError {
    PlatformError::Rest(RestError::Status {
        url: url.to_string(),
        status: 404,
        body: String::new(),
    })
}

#[async_trait]
impl Platform for FakePlatform {
    async fn create_comment(&self, event_id: &str, comment: &str) -> Result<(), PlatformError> {
        self.comments
            .lock()
            .unwrap()
            .push((event_id.to_string(), comment.to_string()));
        Ok(())
    }

    async fn update_events(&self, update: &EventUpdate) -> Result<(), PlatformError> {
        if self.fail_updates {
            return Err(not_found("bulk_update"));
        }
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn user_roles(&self, username: &str) -> Result<Vec<String>, PlatformError> {
        self.roles
            .get(username)
            .cloned()
            .ok_or_else(|| not_found(username))
    }

    async fn app_version(&self, app: &str) -> Result<String, PlatformError> {
        self.version.clone().ok_or_else(|| not_found(app))
    }

    async fn stored_password(&self, _app: &str, name: &str) -> Result<String, PlatformError> {
        self.password.clone().ok_or_else(|| not_found(name))
    }

    async fn grouped_events(&self, group_id: &str) -> Vec<Result<Record, EventSourceError>> {
        self.requested_groups
            .lock()
            .unwrap()
            .push(group_id.to_string());
        self.children
            .iter()
            .map(|child| child.clone().map_err(EventSourceError::Malformed))
            .collect()
    }
}

/// Hands out the same fake for every connection.
pub struct FakeConnector(pub Arc<FakePlatform>);

impl PlatformConnector for FakeConnector {
    fn connect(
        &self,
        _server_uri: &str,
        _session_key: &str,
    ) -> Result<Arc<dyn Platform>, PlatformError> {
        Ok(self.0.clone())
    }
}

/// A request envelope as splunkd forwards it.
pub fn envelope(method: &str, payload: &Value) -> String {
    serde_json::json!({
        "method": method,
        "payload": payload.to_string(),
        "session": { "authtoken": "session-key" },
        "server": { "rest_uri": "https://127.0.0.1:8089" },
    })
    .to_string()
}

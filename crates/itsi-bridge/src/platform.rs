//! The monitoring-platform seam.
//!
//! Everything the bridge reads from or writes to Splunk/ITSI goes through the
//! [`Platform`] trait, so the alert action and the request handlers can run
//! against the REST implementation ([`crate::splunk::SplunkPlatform`]) or an
//! in-memory double.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{EventSourceError, PlatformError};
use crate::Record;

/// This integration's Splunk app name (scopes stored credentials).
pub const APP_NAME: &str = "puppetenterprise_itsi";

/// The ITSI app whose version gates owner/status updates.
pub const ITSI_APP_NAME: &str = "SA-ITOA";

/// Roles that make a Splunk user a valid ITSI event owner.
pub const DEFAULT_ITSI_ROLES: &[&str] = &["itoa_user", "itoa_analyst", "itoa_admin"];

/// Status/owner change for one or more notable events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventUpdate {
    pub event_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl EventUpdate {
    /// True when neither status nor owner would change.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.status.is_none() && self.owner.is_none()
    }
}

/// Operations the bridge needs from Splunk/ITSI.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Add a comment to a notable event.
    async fn create_comment(&self, event_id: &str, comment: &str) -> Result<(), PlatformError>;

    /// Apply a status/owner update.
    async fn update_events(&self, update: &EventUpdate) -> Result<(), PlatformError>;

    /// Roles held by a Splunk user.
    async fn user_roles(&self, username: &str) -> Result<Vec<String>, PlatformError>;

    /// Installed version of a Splunk app.
    async fn app_version(&self, app: &str) -> Result<String, PlatformError>;

    /// Clear-text value of a stored credential of `app`.
    async fn stored_password(&self, app: &str, name: &str) -> Result<String, PlatformError>;

    /// Child events of a notable event group, each either an event or the
    /// reason it could not be produced.
    async fn grouped_events(&self, group_id: &str) -> Vec<Result<Record, EventSourceError>>;
}

/// Opens a [`Platform`] for one server and session.
pub trait PlatformConnector: Send + Sync {
    fn connect(&self, server_uri: &str, session_key: &str)
        -> Result<Arc<dyn Platform>, PlatformError>;
}

/// Restricts another connector to a single splunkd server URI.
///
/// Any other URI is refused with [`PlatformError::UntrustedServer`] before a
/// connection is opened.
pub struct PinnedConnector {
    inner: Arc<dyn PlatformConnector>,
    server_uri: String,
}

impl PinnedConnector {
    pub fn new(inner: Arc<dyn PlatformConnector>, server_uri: &str) -> Self {
        Self {
            inner,
            server_uri: normalize_uri(server_uri),
        }
    }

    #[must_use]
    pub fn server_uri(&self) -> &str {
        &self.server_uri
    }
}

impl PlatformConnector for PinnedConnector {
    fn connect(
        &self,
        server_uri: &str,
        session_key: &str,
    ) -> Result<Arc<dyn Platform>, PlatformError> {
        if normalize_uri(server_uri) != self.server_uri {
            warn!(
                server_uri = %server_uri,
                allowed = %self.server_uri,
                "warning=UNTRUSTED_SERVER Refusing request for another server"
            );
            return Err(PlatformError::UntrustedServer(server_uri.to_string()));
        }
        self.inner.connect(&self.server_uri, session_key)
    }
}

fn normalize_uri(uri: &str) -> String {
    uri.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// Compare two role lists for any overlap.
#[must_use]
pub fn has_role(user_roles: &[String], roles_to_check: &[String]) -> bool {
    roles_to_check.iter().any(|role| user_roles.contains(role))
}

/// Whether `username` exists and holds one of `itsi_roles`.
///
/// Lookup failures count as "not an ITSI user".
pub async fn is_itsi_user(platform: &dyn Platform, username: &str, itsi_roles: &[String]) -> bool {
    info!(username = %username, "action=IS_ITSI_USER");

    match platform.user_roles(username).await {
        Ok(roles) if has_role(&roles, itsi_roles) => true,
        Ok(roles) => {
            warn!(
                username = %username,
                roles = %roles.join(","),
                valid_roles = %itsi_roles.join(","),
                "warning=INVALID_USER"
            );
            false
        }
        Err(e) => {
            warn!(username = %username, error = %e, "warning=CHECK_USER_FAILED Unable to find user");
            false
        }
    }
}

/// Installed ITSI version, or `None` if it cannot be determined.
pub async fn itsi_version(platform: &dyn Platform) -> Option<String> {
    info!(app_name = ITSI_APP_NAME, "action=GET_ITSI_VERSION");

    match platform.app_version(ITSI_APP_NAME).await {
        Ok(version) => Some(version),
        Err(e) => {
            warn!(
                app_name = ITSI_APP_NAME,
                error = %e,
                "warning=GET_ITSI_VERSION_FAILED Unable to find local app"
            );
            None
        }
    }
}

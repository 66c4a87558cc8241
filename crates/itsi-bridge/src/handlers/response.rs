//! Applies a Puppet Enterprise response (acknowledge, resolve, ...) to a
//! notable event: comment, then status/owner update.

use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info, warn};

use super::{children, required_text, text_field, HandlerResponse, RequestContext, RequestHandler};
use crate::config::DEFAULT_UNSUPPORTED_VERSIONS;
use crate::error::HandlerError;
use crate::platform::{self, EventUpdate, Platform, DEFAULT_ITSI_ROLES};
use crate::telemetry::LogTarget;
use crate::Record;

/// Responses Puppet Enterprise can send back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseAction {
    Acknowledge,
    Resolve,
    Close,
    Escalate,
}

impl ResponseAction {
    pub const ALL: [Self; 4] = [Self::Acknowledge, Self::Resolve, Self::Close, Self::Escalate];

    /// Case-insensitive lookup.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(name.trim()))
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::Resolve => "resolve",
            Self::Close => "close",
            Self::Escalate => "escalate",
        }
    }

    /// ITSI status code the response moves the event to.
    #[must_use]
    pub const fn status(&self) -> Option<&'static str> {
        match self {
            Self::Acknowledge => Some("2"),
            Self::Resolve => Some("4"),
            Self::Close => Some("5"),
            Self::Escalate => None,
        }
    }
}

/// Status for a raw `response` value; unknown responses are logged.
#[must_use]
pub fn status_for(response: &str) -> Option<&'static str> {
    if let Some(action) = ResponseAction::from_name(response) {
        action.status()
    } else {
        let valid: Vec<&str> = ResponseAction::ALL.iter().map(ResponseAction::as_str).collect();
        error!(
            response = %response.to_lowercase(),
            valid_responses = %valid.join(","),
            "error=INVALID_RESPONSE"
        );
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseConfig {
    /// ITSI versions where only the comment is written
    pub unsupported_versions: Vec<String>,
    /// Roles a user needs to become event owner
    pub itsi_roles: Vec<String>,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            unsupported_versions: DEFAULT_UNSUPPORTED_VERSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            itsi_roles: DEFAULT_ITSI_ROLES.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseHandler {
    config: ResponseConfig,
}

impl ResponseHandler {
    #[must_use]
    pub const fn new(config: ResponseConfig) -> Self {
        Self { config }
    }

    /// Apply `update`; a no-op update counts as success.
    async fn update_event(platform: &dyn Platform, update: &EventUpdate) -> bool {
        if update.is_noop() {
            warn!(
                event_ids = %update.event_ids.join(","),
                "warning=NO_EVENT_UPDATE no change to status and owner"
            );
            return true;
        }

        match platform.update_events(update).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    event_ids = %update.event_ids.join(","),
                    error = %e,
                    "error=UPDATE_EVENT_ERROR Unable to update event"
                );
                false
            }
        }
    }

    fn success(owner: Option<&str>, status: Option<&str>) -> HandlerResponse {
        HandlerResponse::new(
            200,
            json!({
                "message": "Successfully handled event response",
                "is_update_successful": true,
                "owner": owner,
                "status": status,
            }),
        )
    }
}

#[async_trait]
impl RequestHandler for ResponseHandler {
    fn name(&self) -> &'static str {
        "response"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["event_id", "owner", "response", "message"]
    }

    async fn process_request(
        &self,
        payload: &Record,
        ctx: &RequestContext,
    ) -> Result<HandlerResponse, HandlerError> {
        let event_id = required_text(payload, "event_id")?;
        let response = required_text(payload, "response")?;
        let message = required_text(payload, "message")?;
        let mut owner = text_field(payload, "owner")?.filter(|o| !o.trim().is_empty());

        let status = status_for(response);
        info!(
            event_id = %event_id,
            children = %children(payload).join(","),
            owner = ?owner,
            message = %message,
            response = %response,
            status = ?status,
            "action=PROCESS_RESPONSE"
        );

        let platform = ctx.platform.as_ref();

        if let Some(name) = owner {
            if !platform::is_itsi_user(platform, name, &self.config.itsi_roles).await {
                owner = None;
            }
        }

        let version = platform::itsi_version(platform).await;
        platform.create_comment(event_id, message).await?;

        if let Some(version) = version
            .as_deref()
            .filter(|v| self.config.unsupported_versions.iter().any(|u| u == v))
        {
            warn!(
                version = %version,
                "warning=LIMITED_FUNCTIONALITY unable to update owner and status due to version"
            );
            return Ok(Self::success(owner, status));
        }

        let update = EventUpdate {
            event_ids: vec![event_id.to_string()],
            status: status.map(str::to_string),
            owner: owner.map(str::to_string),
        };

        if Self::update_event(platform, &update).await {
            return Ok(Self::success(owner, status));
        }

        let failure = format!(
            "A problem occured while acknowledging these Notable Events. Review the {} for more details.",
            LogTarget::RestHandler.file_name()
        );
        platform.create_comment(event_id, &failure).await?;

        Ok(HandlerResponse::new(
            400,
            json!({ "message": failure, "is_update_successful": false }),
        ))
    }
}

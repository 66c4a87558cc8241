//! The ITSI notable-event alert action.
//!
//! One invocation collects the grouped events of the triggering correlation
//! event, sends a single Puppet Enterprise event describing them, and comments
//! the outcome back onto ITSI. There are no retries.

use pe_sdk::{Credentials, PeClient, PeEvent};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{ActionConfig, AlertSettings, AuthScheme, PASSWORD_NAME};
use crate::error::{ActionError, EventSourceError};
use crate::mapping::{self, InvalidEventId, CORRELATION_KEYS, EVENT_KEYS};
use crate::platform::{Platform, PlatformConnector, APP_NAME};
use crate::severity::{SeverityBuckets, SeverityLabel};
use crate::telemetry::LogTarget;
use crate::Record;

/// How an invocation ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Puppet Enterprise accepted the event.
    Sent {
        request_id: String,
        event_count: usize,
    },
    /// A validation error stopped the action before anything was sent.
    Abandoned { reason: String },
}

/// Grouped events gathered for one outbound event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedEvents {
    /// Event id → mapped event details
    pub events_by_id: Record,
    pub event_ids_by_severity: SeverityBuckets,
}

impl CollectedEvents {
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events_by_id.len()
    }
}

/// Fold the grouped-event sequence into [`CollectedEvents`].
///
/// The first failed item aborts collection; events without a string
/// `event_id` are skipped.
pub fn collect_events(
    items: impl IntoIterator<Item = Result<Record, EventSourceError>>,
) -> Result<CollectedEvents, ActionError> {
    let mut collected = CollectedEvents::default();

    for item in items {
        let event = item.inspect_err(|e| error!(error = %e, "Grouped event could not be read"))?;

        let event_id = match mapping::require_event_id(&event) {
            Ok(event_id) => event_id,
            Err(InvalidEventId::Missing) => {
                warn!("Event does not have an `event_id`. No-op.");
                continue;
            }
            Err(InvalidEventId::UnsupportedType(value_type)) => {
                warn!(
                    value_type = value_type,
                    "warning=INVALID_EVENT_ID Event `event_id` has an unsupported type. No-op."
                );
                continue;
            }
        };

        let details = mapping::map_fields(EVENT_KEYS, &event);
        let label = SeverityLabel::from_code(details.get("severity").and_then(Value::as_str));

        collected.event_ids_by_severity.push(label, event_id);
        collected
            .events_by_id
            .insert(event_id.to_string(), Value::Object(details));
    }

    Ok(collected)
}

/// Build the Puppet Enterprise client, looking up the stored secret when a
/// username is configured.
pub async fn build_pe_client(
    config: &ActionConfig,
    platform: &dyn Platform,
) -> Result<PeClient, ActionError> {
    let mut client = PeClient::new();

    if let Some(username) = config.username() {
        let password = platform
            .stored_password(APP_NAME, PASSWORD_NAME)
            .await
            .map_err(|source| ActionError::Password {
                name: PASSWORD_NAME.to_string(),
                source,
            })?;

        client.add_credentials(match config.auth_scheme {
            AuthScheme::Token => Credentials::Token(password),
            AuthScheme::Basic => Credentials::Basic {
                username: username.to_string(),
                password,
            },
        });
    }

    Ok(client)
}

/// Forwards one ITSI notable-event group to Puppet Enterprise.
pub struct AlertAction {
    settings: AlertSettings,
    platform: Arc<dyn Platform>,
    client: PeClient,
}

impl AlertAction {
    pub fn new(settings: AlertSettings, platform: Arc<dyn Platform>, client: PeClient) -> Self {
        let config = &settings.configuration;
        info!(
            username = ?config.username(),
            endpoint_url = %config.endpoint_url,
            recipients = %config.recipients,
            priority = ?config.priority(),
            "action=PE_ITSI_INIT"
        );
        Self {
            settings,
            platform,
            client,
        }
    }

    /// Connect to the platform named in `settings` and build the client.
    pub async fn connect(
        settings: AlertSettings,
        connector: &dyn PlatformConnector,
    ) -> Result<Self, ActionError> {
        let platform = connector.connect(&settings.server_uri, &settings.session_key)?;
        let client = build_pe_client(&settings.configuration, platform.as_ref()).await?;
        Ok(Self::new(settings, platform, client))
    }

    #[must_use]
    pub fn correlation_event_id(&self) -> Option<&str> {
        mapping::event_id(&self.settings.result)
    }

    /// Group whose children are forwarded; falls back to the correlation id.
    fn group_id<'a>(&'a self, correlation_event_id: &'a str) -> &'a str {
        self.settings
            .result
            .get("itsi_group_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(correlation_event_id)
    }

    /// Run the action.
    ///
    /// Validation errors are logged and reported as
    /// [`ActionOutcome::Abandoned`]; every other error is returned.
    pub async fn execute(&self) -> Result<ActionOutcome, ActionError> {
        match self.run().await {
            Err(e) if e.is_validation() => {
                warn!(error = %e, "Alert configuration rejected, nothing sent");
                Ok(ActionOutcome::Abandoned {
                    reason: e.to_string(),
                })
            }
            other => other,
        }
    }

    async fn run(&self) -> Result<ActionOutcome, ActionError> {
        let correlation_event_id = self
            .correlation_event_id()
            .ok_or(ActionError::MissingCorrelationId)?;

        let items = self
            .platform
            .grouped_events(self.group_id(correlation_event_id))
            .await;
        let collected = collect_events(items)?;

        let event = self.build_event(&collected)?;
        let config = &self.settings.configuration;

        let Some(request_id) = self.client.send_event(&config.endpoint_url, &event).await else {
            let message = format!(
                "An error occurred while sending request to puppetenterprise. See {} for details.",
                LogTarget::AlertAction.file_name()
            );
            if let Err(e) = self
                .platform
                .create_comment(correlation_event_id, &message)
                .await
            {
                error!(error = %e, event_id = %correlation_event_id, "Failed to write failure comment");
            }
            return Err(ActionError::SendFailed);
        };

        if config.update_correlation {
            self.add_success_comment(correlation_event_id, &request_id)
                .await?;
        }

        if config.update_children {
            for event_id in collected.events_by_id.keys() {
                if event_id != correlation_event_id || !config.update_correlation {
                    self.add_success_comment(event_id, &request_id).await?;
                }
            }
        }

        info!(
            request_id = %request_id,
            event_count = collected.event_count(),
            "Sent notable events to Puppet Enterprise"
        );

        Ok(ActionOutcome::Sent {
            request_id,
            event_count: collected.event_count(),
        })
    }

    /// Assemble the outbound event for the collected group.
    pub fn build_event(&self, collected: &CollectedEvents) -> Result<PeEvent, ActionError> {
        let config = &self.settings.configuration;
        let mut event = PeEvent::new();

        for (key, value) in mapping::map_fields(CORRELATION_KEYS, &self.settings.result) {
            event.add_property(key, value);
        }

        event.add_property("event_count", collected.event_count());
        event.add_property("events_by_id", collected.events_by_id.clone());
        event.add_property(
            "event_ids_by_severity",
            collected.event_ids_by_severity.to_value(),
        );
        event.add_property("pe_should_update_correlation", config.update_correlation);
        event.add_property("pe_should_update_children", config.update_children);

        for target_name in config.recipient_names() {
            event.add_recipient(target_name);
        }

        if let Some(priority) = config.priority() {
            event.set_priority(priority)?;
        }

        Ok(event)
    }

    async fn add_success_comment(
        &self,
        event_id: &str,
        request_id: &str,
    ) -> Result<(), ActionError> {
        let comment = format!("Successfully sent request to Puppet Enterprise: [{request_id}]");
        self.platform.create_comment(event_id, &comment).await?;
        Ok(())
    }
}

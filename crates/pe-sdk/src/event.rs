//! Outbound Puppet Enterprise event.
//!
//! Wraps the event body so callers cannot produce an invalid priority or
//! `null`-valued optional keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::PriorityError;

/// Priority accepted by Puppet Enterprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Every accepted priority, in wire order.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = PriorityError;

    /// Case-insensitive match against `HIGH`, `MEDIUM`, `LOW`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == upper)
            .ok_or_else(|| PriorityError {
                value: upper,
                valid: Self::ALL.map(|p| p.as_str()).join(";"),
            })
    }
}

/// A user, group, team or device that should receive the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(rename = "targetName")]
    pub target_name: String,
}

/// Event sent to Puppet Enterprise.
///
/// `recipients` and `priority` are left out of the serialized body entirely
/// when empty or unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeEvent {
    properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    recipients: Vec<Recipient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
}

impl PeEvent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a property.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Append a recipient. Duplicates are kept.
    pub fn add_recipient(&mut self, target_name: impl Into<String>) {
        self.recipients.push(Recipient {
            target_name: target_name.into(),
        });
    }

    /// Set the priority from a case-insensitive string.
    ///
    /// # Errors
    /// Returns [`PriorityError`] if the value is not `HIGH`, `MEDIUM` or `LOW`.
    pub fn set_priority(&mut self, priority: &str) -> Result<(), PriorityError> {
        self.priority = Some(priority.parse()?);
        Ok(())
    }

    #[must_use]
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    #[must_use]
    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    #[must_use]
    pub const fn priority(&self) -> Option<Priority> {
        self.priority
    }

    /// Serialize to the JSON body posted to Puppet Enterprise.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_priority_is_case_insensitive() {
        for input in ["high", "High", "HIGH"] {
            assert_eq!(input.parse::<Priority>().unwrap(), Priority::High);
        }
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert_eq!("Medium".parse::<Priority>().unwrap(), Priority::Medium);
    }

    #[test]
    fn test_invalid_priority() {
        let mut event = PeEvent::new();
        let err = event.set_priority("urgent").unwrap_err();
        assert_eq!(err.value, "URGENT");
        assert_eq!(err.valid, "HIGH;MEDIUM;LOW");
        assert!(err.to_string().contains("PUPPETENTERPRISE_INVALID_PRIORITY"));
        assert_eq!(event.priority(), None);
    }

    #[test]
    fn test_minimal_event_omits_optional_keys() {
        let mut event = PeEvent::new();
        event.add_property("event_id", "1");

        let body: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(body, json!({ "properties": { "event_id": "1" } }));
    }

    #[test]
    fn test_full_event_serialization() {
        let mut event = PeEvent::new();
        event.add_property("event_count", 2);
        event.add_property("pe_should_update_children", false);
        event.add_recipient("ops");
        event.add_recipient("ops");
        event.set_priority("low").unwrap();

        let body: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "properties": { "event_count": 2, "pe_should_update_children": false },
                "recipients": [{ "targetName": "ops" }, { "targetName": "ops" }],
                "priority": "LOW"
            })
        );
    }

    #[test]
    fn test_add_property_replaces_existing() {
        let mut event = PeEvent::new();
        event.add_property("host", "a");
        event.add_property("host", "b");
        assert_eq!(event.properties().len(), 1);
        assert_eq!(event.properties()["host"], "b");
    }
}

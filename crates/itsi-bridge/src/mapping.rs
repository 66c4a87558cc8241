//! Extraction of the allowlisted notable-event fields sent to Puppet Enterprise.

use serde_json::Value;
use tracing::warn;

use crate::Record;

/// Keys of each grouped event placed in the `events_by_id` property.
pub const EVENT_KEYS: &[&str] = &[
    "alert_level",
    "alert_severity",
    "alert_value",
    "change_type",
    "composite_kpi_name",
    "description",
    "drilldown_uri",
    "event_description",
    "event_id",
    "health_score",
    "host",
    "linecount",
    "orig_index",
    "owner",
    "scoretype",
    "search_name",
    "service_ids",
    "severity",
    "severity_label",
    "source",
    "splunk_server",
    "tag",
    "time",
    "title",
];

/// Keys of the correlation event added directly to the event properties.
pub const CORRELATION_KEYS: &[&str] = &[
    "alert_level",
    "alert_severity",
    "alert_value",
    "change_type",
    "composite_kpi_id",
    "composite_kpi_name",
    "description",
    "drilldown_search_search",
    "drilldown_uri",
    "event_description",
    "event_id",
    "health_score",
    "host",
    "index",
    "latest_alert_level",
    "linecount",
    "orig_index",
    "owner",
    "scoretype",
    "search_name",
    "search_type",
    "service_ids",
    "severity",
    "severity_label",
    "severity_value",
    "source",
    "splunk_server",
    "splunk_server_group",
    "tag",
    "time",
    "title",
];

/// A notable-event field value, classified by what the mapper can do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    List(Vec<&'a str>),
    Absent,
    /// Anything else; carries the JSON type name for logging
    Unsupported(&'static str),
}

impl<'a> FieldValue<'a> {
    #[must_use]
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::String(s)) => Self::Text(s),
            Some(Value::Array(items)) => items
                .iter()
                .map(Value::as_str)
                .collect::<Option<Vec<_>>>()
                .map_or(Self::Unsupported("mixed array"), Self::List),
            Some(Value::Bool(_)) => Self::Unsupported("bool"),
            Some(Value::Number(_)) => Self::Unsupported("number"),
            Some(Value::Object(_)) => Self::Unsupported("object"),
        }
    }

    /// The string sent to Puppet Enterprise, or `None` if the field is dropped.
    #[must_use]
    pub fn coerce(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.to_string()),
            Self::List(items) => Some(items.join(",")),
            Self::Absent => Some(String::new()),
            Self::Unsupported(_) => None,
        }
    }
}

/// Copy the `keys` of `record` into a new record of string values.
///
/// Unsupported values are dropped with a warning; missing keys become `""`.
#[must_use]
pub fn map_fields(keys: &[&str], record: &Record) -> Record {
    let mut result = Record::new();
    for &key in keys {
        let value = FieldValue::classify(record.get(key));
        if let FieldValue::Unsupported(value_type) = value {
            warn!(key = key, value_type = value_type, "warning=INVALID_PROP_TYPE");
            continue;
        }
        if let Some(coerced) = value.coerce() {
            result.insert(key.to_string(), Value::String(coerced));
        }
    }
    result
}

/// Why a record has no usable `event_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidEventId {
    /// Absent, null or empty
    Missing,
    /// Present but not a string; carries the JSON type name
    UnsupportedType(&'static str),
}

/// The non-empty string `event_id` of a record.
pub fn require_event_id(record: &Record) -> Result<&str, InvalidEventId> {
    match FieldValue::classify(record.get("event_id")) {
        FieldValue::Text(id) if !id.is_empty() => Ok(id),
        FieldValue::Text(_) | FieldValue::Absent => Err(InvalidEventId::Missing),
        FieldValue::List(_) => Err(InvalidEventId::UnsupportedType("array")),
        FieldValue::Unsupported(value_type) => Err(InvalidEventId::UnsupportedType(value_type)),
    }
}

/// The non-empty `event_id` of a record, if it has one.
#[must_use]
pub fn event_id(record: &Record) -> Option<&str> {
    require_event_id(record).ok()
}

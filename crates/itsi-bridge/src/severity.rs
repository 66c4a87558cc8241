//! Severity labels for ITSI severity codes.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Canonical severity bucket of a notable event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLabel {
    Critical,
    High,
    Medium,
    Low,
    Normal,
    Info,
    /// Missing or unrecognized severity code
    Other,
}

impl SeverityLabel {
    pub const ALL: [Self; 7] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Normal,
        Self::Info,
        Self::Other,
    ];

    /// Label for an ITSI severity code (`"1"` info through `"6"` critical).
    #[must_use]
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("1") => Self::Info,
            Some("2") => Self::Normal,
            Some("3") => Self::Low,
            Some("4") => Self::Medium,
            Some("5") => Self::High,
            Some("6") => Self::Critical,
            other => {
                warn!(severity = ?other, "type=BAD_SEVERITY");
                Self::Other
            }
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::Info => "info",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for SeverityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event ids grouped by severity. Every label is present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityBuckets(BTreeMap<SeverityLabel, Vec<String>>);

impl Default for SeverityBuckets {
    fn default() -> Self {
        Self(
            SeverityLabel::ALL
                .into_iter()
                .map(|label| (label, Vec::new()))
                .collect(),
        )
    }
}

impl SeverityBuckets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: SeverityLabel, event_id: impl Into<String>) {
        self.0.entry(label).or_default().push(event_id.into());
    }

    #[must_use]
    pub fn get(&self, label: SeverityLabel) -> &[String] {
        self.0.get(&label).map(Vec::as_slice).unwrap_or_default()
    }

    /// JSON object keyed by label name.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(label, ids)| (label.as_str().to_string(), Value::from(ids.clone())))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_codes() {
        let expected = [
            ("1", SeverityLabel::Info),
            ("2", SeverityLabel::Normal),
            ("3", SeverityLabel::Low),
            ("4", SeverityLabel::Medium),
            ("5", SeverityLabel::High),
            ("6", SeverityLabel::Critical),
        ];
        for (code, label) in expected {
            assert_eq!(SeverityLabel::from_code(Some(code)), label);
        }
    }

    #[test]
    fn test_unknown_codes_are_other() {
        for code in ["0", "7", "", "high", " 5", "5.0"] {
            assert_eq!(SeverityLabel::from_code(Some(code)), SeverityLabel::Other);
        }
        assert_eq!(SeverityLabel::from_code(None), SeverityLabel::Other);
    }

    #[test]
    fn test_buckets_always_have_every_label() {
        let mut buckets = SeverityBuckets::new();
        buckets.push(SeverityLabel::High, "e1");
        buckets.push(SeverityLabel::High, "e2");

        assert_eq!(buckets.get(SeverityLabel::High), ["e1", "e2"]);
        assert_eq!(
            buckets.to_value(),
            json!({
                "critical": [],
                "high": ["e1", "e2"],
                "medium": [],
                "low": [],
                "normal": [],
                "info": [],
                "other": []
            })
        );
    }
}

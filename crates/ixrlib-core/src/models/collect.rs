use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named occurrence in the application, e.g. `level_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Event {
    pub timestamp: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EventBatch {
    pub data: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LogEntry {
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LogBatch {
    pub data: Vec<LogEntry>,
}

/// A sampled measurement, e.g. headset position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TelemetryEntry {
    pub timestamp: String,
    pub name: String,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TelemetryBatch {
    pub data: Vec<TelemetryEntry>,
}

impl From<Vec<Event>> for EventBatch {
    fn from(data: Vec<Event>) -> Self {
        Self { data }
    }
}

impl From<Vec<LogEntry>> for LogBatch {
    fn from(data: Vec<LogEntry>) -> Self {
        Self { data }
    }
}

impl From<Vec<TelemetryEntry>> for TelemetryBatch {
    fn from(data: Vec<TelemetryEntry>) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_wire_shape() {
        let entry = LogEntry {
            timestamp: "2024-05-01T10:00:00Z".into(),
            log_level: Some("info".into()),
            text: Some("scene loaded".into()),
            meta: None,
        };
        let json = serde_json::to_value(LogBatch::from(vec![entry])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"data": [{
                "timestamp": "2024-05-01T10:00:00Z",
                "logLevel": "info",
                "text": "scene loaded"
            }]})
        );
    }

    #[test]
    fn test_event_parses_without_meta() {
        let event: Event =
            serde_json::from_str(r#"{"timestamp":"2024-05-01T10:00:00Z","name":"grab"}"#).unwrap();
        assert_eq!(event.name, "grab");
        assert!(event.meta.is_none());
    }
}

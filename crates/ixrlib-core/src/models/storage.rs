use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named record kept server-side for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StorageEntry {
    pub timestamp: String,
    pub name: String,
    pub data: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_data: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StorageBatch {
    pub data: Vec<StorageEntry>,
}

impl From<Vec<StorageEntry>> for StorageBatch {
    fn from(data: Vec<StorageEntry>) -> Self {
        Self { data }
    }
}

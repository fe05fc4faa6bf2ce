use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Device and application identity exchanged for a token/secret pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthRequest {
    pub app_id: String,
    pub org_id: String,
    pub device_id: String,
    pub auth_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xrdm_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl AuthRequest {
    pub fn new(
        app_id: impl Into<String>,
        org_id: impl Into<String>,
        device_id: impl Into<String>,
        auth_secret: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            org_id: org_id.into(),
            device_id: device_id.into(),
            auth_secret: auth_secret.into(),
            ..Self::default()
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Check the fields the service cannot do without. Returns the reason
    /// on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.app_id.trim().is_empty() {
            return Err("appId is required".to_string());
        }
        Ok(())
    }

    /// Session id to send: the caller's own, else the one carried over.
    pub(crate) fn effective_session_id(&self, carried: &str) -> String {
        match self.session_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => carried.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthResponse {
    pub token: String,
    pub secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_app_id() {
        assert!(AuthRequest::new("app", "org", "dev", "s").validate().is_ok());
        assert!(AuthRequest::new("", "org", "dev", "s").validate().is_err());
        assert!(AuthRequest::new("   ", "org", "dev", "s").validate().is_err());
    }

    #[test]
    fn test_serializes_camel_case_and_skips_unset() {
        let request = AuthRequest::new("app", "org", "dev", "s").with_user_id("u1");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "appId": "app",
                "orgId": "org",
                "deviceId": "dev",
                "authSecret": "s",
                "userId": "u1"
            })
        );
    }

    #[test]
    fn test_effective_session_id_prefers_request() {
        let plain = AuthRequest::new("app", "org", "dev", "s");
        assert_eq!(plain.effective_session_id("carried"), "carried");

        let empty = plain.clone().with_session_id("");
        assert_eq!(empty.effective_session_id("carried"), "carried");

        let own = plain.with_session_id("mine");
        assert_eq!(own.effective_session_id("carried"), "mine");
    }
}

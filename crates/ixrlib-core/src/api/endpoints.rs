//! Typed entry points for the service's endpoint groups.
//!
//! Each helper is a single [`ApiClient`] call; authentication, signing and
//! retries all happen in the client.

use super::{ApiClient, ApiError, ApiResponse};
use crate::models::{AuthRequest, EventBatch, LogBatch, Prompt, StorageBatch, TelemetryBatch};

const CONFIG_PATH: &str = "/v1/config";
const EVENT_PATH: &str = "/v1/collect/event";
const LOG_PATH: &str = "/v1/collect/log";
const TELEMETRY_PATH: &str = "/v1/collect/telemetry";
const LLM_PATH: &str = "/v1/services/llm";
const STORAGE_PATH: &str = "/v1/storage";
const STORAGE_CONFIG_PATH: &str = "/v1/storage/config";

impl ApiClient {
    pub fn auth(&self) -> Auth<'_> {
        Auth { client: self }
    }

    pub fn remote_config(&self) -> RemoteConfig<'_> {
        RemoteConfig { client: self }
    }

    pub fn collect(&self) -> Collect<'_> {
        Collect { client: self }
    }

    pub fn services(&self) -> Services<'_> {
        Services { client: self }
    }

    pub fn storage(&self) -> Storage<'_> {
        Storage { client: self }
    }
}

pub struct Auth<'a> {
    client: &'a ApiClient,
}

impl Auth<'_> {
    /// Exchange `request` for fresh credentials, replacing any held pair.
    pub async fn login(&self, request: &AuthRequest) -> Result<(), ApiError> {
        self.client.auth_controller().login(request).await
    }

    pub async fn ping(&self) -> Result<ApiResponse, ApiError> {
        self.client.auth_controller().ping().await
    }
}

pub struct RemoteConfig<'a> {
    client: &'a ApiClient,
}

impl RemoteConfig<'_> {
    pub async fn get(&self) -> Result<ApiResponse, ApiError> {
        self.client.get(CONFIG_PATH).await
    }
}

pub struct Collect<'a> {
    client: &'a ApiClient,
}

impl Collect<'_> {
    pub async fn event(&self, batch: &EventBatch) -> Result<ApiResponse, ApiError> {
        self.client.post(EVENT_PATH, batch).await
    }

    pub async fn log(&self, batch: &LogBatch) -> Result<ApiResponse, ApiError> {
        self.client.post(LOG_PATH, batch).await
    }

    pub async fn telemetry(&self, batch: &TelemetryBatch) -> Result<ApiResponse, ApiError> {
        self.client.post(TELEMETRY_PATH, batch).await
    }
}

pub struct Services<'a> {
    client: &'a ApiClient,
}

impl Services<'_> {
    /// Forward a prompt to the service's LLM proxy.
    pub async fn llm(&self, prompt: &Prompt) -> Result<ApiResponse, ApiError> {
        self.client.post(LLM_PATH, prompt).await
    }
}

pub struct Storage<'a> {
    client: &'a ApiClient,
}

impl Storage<'_> {
    pub async fn store(&self, batch: &StorageBatch) -> Result<ApiResponse, ApiError> {
        self.client.post(STORAGE_PATH, batch).await
    }

    pub async fn get(&self) -> Result<ApiResponse<StorageBatch>, ApiError> {
        let response = self.client.get(STORAGE_PATH).await?;
        let status = response.status;
        response.into_typed().map_err(|e| ApiError::Server {
            method: reqwest::Method::GET,
            path: STORAGE_PATH.to_string(),
            status,
            body: format!("unexpected storage payload: {}", e),
        })
    }

    pub async fn reset(&self) -> Result<ApiResponse, ApiError> {
        self.client.delete(STORAGE_PATH).await
    }

    pub async fn config(&self) -> Result<ApiResponse, ApiError> {
        self.client.get(STORAGE_CONFIG_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::{CredentialStore, Credentials};
    use crate::config::ClientConfig;
    use crate::models::{Event, LogEntry, StorageEntry};

    fn signed_in_client(server: &MockServer) -> ApiClient {
        let store = CredentialStore::in_memory();
        store
            .save(&Credentials {
                token: "tok".to_string(),
                secret: "sec".to_string(),
                session_id: "sess".to_string(),
                expires_at: None,
            })
            .unwrap();
        ApiClient::builder(AuthRequest::new("app", "org", "dev", "shh"))
            .config(ClientConfig::with_base_url(server.uri()))
            .store(store)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_collect_event_posts_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/collect/event"))
            .and(header_exists("x-ixrlib-hash"))
            .and(body_json(json!({"data": [{
                "timestamp": "2024-05-01T10:00:00Z",
                "name": "level_start"
            }]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = signed_in_client(&server);
        let batch = EventBatch::from(vec![Event {
            timestamp: "2024-05-01T10:00:00Z".into(),
            name: "level_start".into(),
            meta: None,
        }]);
        let response = client.collect().event(&batch).await.unwrap();
        assert_eq!(response.data, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_collect_log_and_telemetry_hit_their_paths() {
        let server = MockServer::start().await;
        for endpoint in ["/v1/collect/log", "/v1/collect/telemetry"] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = signed_in_client(&server);
        let logs = LogBatch::from(vec![LogEntry {
            timestamp: "2024-05-01T10:00:00Z".into(),
            log_level: Some("warn".into()),
            text: Some("frame drop".into()),
            meta: None,
        }]);
        client.collect().log(&logs).await.unwrap();
        client.collect().telemetry(&TelemetryBatch::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_llm_prompt_and_remote_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/services/llm"))
            .and(body_json(json!({"prompt": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reply": "hi"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"flags": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = signed_in_client(&server);
        let reply = client.services().llm(&Prompt::new("hello")).await.unwrap();
        assert_eq!(reply.data["reply"], "hi");
        let config = client.remote_config().get().await.unwrap();
        assert_eq!(config.data, json!({"flags": []}));
    }

    #[tokio::test]
    async fn test_storage_round() {
        let server = MockServer::start().await;
        let stored = json!({"data": [{
            "timestamp": "2024-05-01T10:00:00Z",
            "name": "progress",
            "data": [{"level": 3}]
        }]});
        Mock::given(method("POST"))
            .and(path("/v1/storage"))
            .and(body_json(stored.clone()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/storage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stored.clone()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/storage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "reset"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/storage/config"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = signed_in_client(&server);
        let mut level = serde_json::Map::new();
        level.insert("level".into(), json!(3));
        let batch = StorageBatch::from(vec![StorageEntry {
            timestamp: "2024-05-01T10:00:00Z".into(),
            name: "progress".into(),
            data: vec![level],
            keep_policy: None,
            origin: None,
            session_data: None,
        }]);

        client.storage().store(&batch).await.unwrap();
        let fetched = client.storage().get().await.unwrap();
        assert_eq!(fetched.data, batch);
        let reset = client.storage().reset().await.unwrap();
        assert_eq!(reset.data["status"], "reset");
        client.storage().config().await.unwrap();
    }

    #[tokio::test]
    async fn test_storage_get_rejects_unexpected_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/storage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = signed_in_client(&server);
        let err = client.storage().get().await.unwrap_err();
        assert!(matches!(err, ApiError::Server { .. }));
    }
}

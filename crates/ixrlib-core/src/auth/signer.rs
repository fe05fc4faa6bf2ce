use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use sha2::{Digest, Sha256};

use super::Credentials;

pub const HASH_HEADER: &str = "x-ixrlib-hash";
pub const TIMESTAMP_HEADER: &str = "x-ixrlib-timestamp";

/// SHA-256 of `bytes`, base64 encoded with padding.
pub fn digest_base64(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

/// Headers proving the request came from the holder of the shared secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authorization: String,
    pub hash: String,
    pub timestamp: String,
}

impl SignedHeaders {
    pub fn to_header_map(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::with_capacity(3);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&self.authorization)?);
        headers.insert(
            HeaderName::from_static(HASH_HEADER),
            HeaderValue::from_str(&self.hash)?,
        );
        headers.insert(
            HeaderName::from_static(TIMESTAMP_HEADER),
            HeaderValue::from_str(&self.timestamp)?,
        );
        Ok(headers)
    }
}

/// Sign a request made at `now` (unix seconds) carrying `body`.
///
/// The hash covers `token + secret + now`, followed by the decimal CRC32 of
/// the body bytes when there is a body. `body` must be the exact bytes put
/// on the wire.
pub fn sign(credentials: &Credentials, body: Option<&[u8]>, now: i64) -> SignedHeaders {
    let timestamp = now.to_string();
    let mut source = String::with_capacity(
        credentials.token.len() + credentials.secret.len() + timestamp.len() + 10,
    );
    source.push_str(&credentials.token);
    source.push_str(&credentials.secret);
    source.push_str(&timestamp);

    if let Some(bytes) = body {
        source.push_str(&crc32fast::hash(bytes).to_string());
    }

    SignedHeaders {
        authorization: format!("Bearer {}", credentials.token),
        hash: digest_base64(source.as_bytes()),
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            token: "t".to_string(),
            secret: "s".to_string(),
            session_id: String::new(),
            expires_at: None,
        }
    }

    #[test]
    fn test_signature_snapshot_with_body() {
        let body = serde_json::to_vec(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(body, br#"{"a":1}"#);
        assert_eq!(crc32fast::hash(&body), 1_444_654_255);

        let signed = sign(&creds(), Some(&body), 1_700_000_000);
        assert_eq!(signed.hash, "DzYgcrZihYJH7JJsZZaPJET95SJaSMUdD/6IeejTW/Y=");
        assert_eq!(signed.hash, digest_base64(b"ts17000000001444654255"));
        assert_eq!(signed.timestamp, "1700000000");
        assert_eq!(signed.authorization, "Bearer t");
    }

    #[test]
    fn test_signature_snapshot_without_body() {
        let signed = sign(&creds(), None, 1_700_000_000);
        assert_eq!(signed.hash, "KilLD2tvioAGYQRzFUFkUWg7yt3KrK5GtI2i8iV9ctU=");
    }

    #[test]
    fn test_signing_is_deterministic() {
        let body = br#"{"name":"level_start"}"#;
        let first = sign(&creds(), Some(body), 1_700_000_123);
        let second = sign(&creds(), Some(&body.to_vec()), 1_700_000_123);
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_inputs_differ() {
        let base = sign(&creds(), Some(br#"{"a":1}"#), 1_700_000_000);
        assert_ne!(base.hash, sign(&creds(), Some(br#"{"a":2}"#), 1_700_000_000).hash);
        assert_ne!(base.hash, sign(&creds(), Some(br#"{"a":1}"#), 1_700_000_001).hash);
        assert_ne!(base.hash, sign(&creds(), None, 1_700_000_000).hash);
    }

    #[test]
    fn test_header_map_carries_all_three_headers() {
        let headers = sign(&creds(), None, 42).to_header_map().unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer t");
        assert_eq!(headers.get("X-iXRLib-Timestamp").unwrap(), "42");
        assert!(headers.contains_key("X-iXRLib-Hash"));
    }

    #[test]
    fn test_header_map_rejects_control_characters_in_token() {
        let mut bad = creds();
        bad.token = "line\nbreak".to_string();
        assert!(sign(&bad, None, 1).to_header_map().is_err());
    }
}

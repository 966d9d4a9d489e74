//! HTTP client for the event-detection (sense) API.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::json;

use crate::backend::EventDetectionBackend;
use crate::error::{Result, SoundscopeError};
use crate::types::{AnalysisSession, InferenceResult, UploadAck};

/// Client for the session-based event-detection service.
pub struct SenseClient {
    client: reqwest::Client,
    base_url: String,
}

impl SenseClient {
    /// Creates a client rooted at `<base_url>/sense/api/v1`.
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        let client = build_http_client(api_key)?;
        Ok(Self {
            client,
            base_url: format!("{}/sense/api/v1", base_url.trim_end_matches('/')),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Shared client construction for both backend APIs: API key and
/// user-agent headers applied to every request.
pub(crate) fn build_http_client(api_key: &str) -> Result<reqwest::Client> {
    use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

    let mut headers = HeaderMap::new();
    let mut key_value = HeaderValue::from_str(api_key).map_err(|e| SoundscopeError::Other(
        format!("invalid API key header value: {e}"),
    ))?;
    key_value.set_sensitive(true);
    headers.insert("X-Api-Key", key_value);
    headers.insert(USER_AGENT, HeaderValue::from_static(user_agent()));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| SoundscopeError::Other(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn user_agent() -> &'static str {
    concat!("soundscope/", env!("CARGO_PKG_VERSION"))
}

fn backend_error(message: String) -> SoundscopeError {
    SoundscopeError::Backend {
        backend: "sense".to_string(),
        message,
    }
}

/// Maps a non-success response into a `Backend` error carrying the raw
/// body, or deserializes it on success.
async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(backend_error(format!("{status}: {body}")));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| backend_error(format!("invalid response body: {e}")))
}

#[async_trait]
impl EventDetectionBackend for SenseClient {
    async fn create_session(
        &self,
        file_name: &str,
        content_type: &str,
        duration: f64,
        total_bytes: u64,
    ) -> Result<AnalysisSession> {
        let body = json!({
            "type": "file",
            "content_type": content_type,
            "total_size": total_bytes,
            "file_name": file_name,
            "file_length": duration,
        });

        let response = self
            .client
            .post(self.url("/audio_sessions/"))
            .json(&body)
            .send()
            .await
            .map_err(|e| backend_error(format!("create session: {e}")))?;
        read_json(response).await
    }

    async fn upload_chunk(
        &self,
        session_id: &str,
        chunk_sequence: u32,
        data: &[u8],
    ) -> Result<UploadAck> {
        let body = json!({ "data": BASE64.encode(data) });

        let response = self
            .client
            .put(self.url(&format!(
                "/audio_sessions/{session_id}/chunks/{chunk_sequence}"
            )))
            .json(&body)
            .send()
            .await
            .map_err(|e| backend_error(format!("upload chunk: {e}")))?;
        read_json(response).await
    }

    async fn get_result(&self, session_id: &str) -> Result<InferenceResult> {
        let response = self
            .client
            .get(self.url(&format!("/audio_sessions/{session_id}/results")))
            .send()
            .await
            .map_err(|e| backend_error(format!("get result: {e}")))?;
        read_json(response).await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/audio_sessions/{session_id}")))
            .send()
            .await
            .map_err(|e| backend_error(format!("delete session: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(format!("{status}: {body}")));
        }
        Ok(())
    }
}

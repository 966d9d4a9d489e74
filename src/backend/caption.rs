//! HTTP client for the captioning API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::CaptionBackend;
use crate::backend::sense::build_http_client;
use crate::error::{Result, SoundscopeError};

#[derive(Debug, Deserialize)]
struct InferResponse {
    caption: String,
}

/// Client for the single-shot caption inference endpoint.
pub struct CaptionClient {
    client: reqwest::Client,
    base_url: String,
}

impl CaptionClient {
    /// Creates a client rooted at `<base_url>/caption/v1`.
    pub fn new(api_key: &str, base_url: &str) -> Result<Self> {
        let client = build_http_client(api_key)?;
        Ok(Self {
            client,
            base_url: format!("{}/caption/v1", base_url.trim_end_matches('/')),
        })
    }

    fn infer_url(&self) -> String {
        format!("{}/infer", self.base_url)
    }
}

fn backend_error(message: String) -> SoundscopeError {
    SoundscopeError::Backend {
        backend: "caption".to_string(),
        message,
    }
}

#[async_trait]
impl CaptionBackend for CaptionClient {
    async fn infer(&self, content_type: &str, file_name: &str, data: Vec<u8>) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(data).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("content_type", content_type.to_string())
            .part("file", part);

        let response = self
            .client
            .post(self.infer_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| backend_error(format!("infer: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(format!("{status}: {body}")));
        }

        let parsed: InferResponse = response
            .json()
            .await
            .map_err(|e| backend_error(format!("invalid response body: {e}")))?;
        Ok(parsed.caption)
    }
}

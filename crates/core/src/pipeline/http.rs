//! reqwest-backed caption pipeline client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::{
    BackendError, GenerateCaptionsRequest, PipelineBackend, PresignedUrlRequest,
    RegisterImageRequest, RegisteredImage, UploadTarget,
};
use crate::config::PipelineConfig;

/// HTTP client for the caption pipeline API.
///
/// Holds one pooled [`Client`]; a single instance is shared by all
/// concurrent runs.
pub struct HttpPipelineBackend {
    client: Client,
    api_base: String,
    timeout: Duration,
}

impl HttpPipelineBackend {
    pub fn new(config: &PipelineConfig) -> Result<Self, BackendError> {
        let timeout = Duration::from_secs(u64::from(config.timeout_secs));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/pipeline/{}", self.api_base, path)
    }

    fn classify(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::from(e)
        }
    }

    /// Turn a non-2xx response into [`BackendError::Status`] carrying its body.
    async fn ensure_success(&self, response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn post_json<B, T>(&self, token: &str, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let response = self.ensure_success(response).await?;
        response.json::<T>().await.map_err(|e| self.classify(e))
    }
}

#[async_trait]
impl PipelineBackend for HttpPipelineBackend {
    async fn generate_presigned_url(
        &self,
        token: &str,
        request: &PresignedUrlRequest,
    ) -> Result<UploadTarget, BackendError> {
        self.post_json(token, "generate-presigned-url", request).await
    }

    async fn upload_image(
        &self,
        presigned_url: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), BackendError> {
        debug!("PUT {} ({} bytes)", presigned_url, bytes.len());

        let response = self
            .client
            .put(presigned_url)
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        self.ensure_success(response).await.map(|_| ())
    }

    async fn register_image(
        &self,
        token: &str,
        request: &RegisterImageRequest,
    ) -> Result<RegisteredImage, BackendError> {
        self.post_json(token, "upload-image-from-url", request).await
    }

    async fn generate_captions(
        &self,
        token: &str,
        request: &GenerateCaptionsRequest,
    ) -> Result<serde_json::Value, BackendError> {
        self.post_json(token, "generate-captions", request).await
    }
}

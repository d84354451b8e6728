//! Caption pipeline orchestration.
//!
//! A run drives four dependent calls against the caption backend:
//! acquire an upload target, PUT the image bytes, register the uploaded
//! image, then generate captions for it. Every attempted step is recorded
//! and the run stops at the first failure.

mod http;
mod runner;
mod types;

pub use http::HttpPipelineBackend;
pub use runner::{PipelineRunner, Stage};
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a single backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// No response within the step timeout.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Connection-level failure.
    #[error("{0}")]
    Transport(String),

    /// A 2xx response whose body did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl BackendError {
    /// Whether the failure is reported against the step that made the call.
    ///
    /// Other failures are faults: the step records nothing and the run
    /// appends a synthetic [`PIPELINE_ERROR_STEP`] entry instead.
    pub fn is_step_failure(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// The remote caption pipeline, one method per call.
///
/// Calls that take a `token` must send it as `Authorization: Bearer`.
/// The upload call must not: the presigned URL is the capability.
#[async_trait]
pub trait PipelineBackend: Send + Sync {
    async fn generate_presigned_url(
        &self,
        token: &str,
        request: &PresignedUrlRequest,
    ) -> Result<UploadTarget, BackendError>;

    async fn upload_image(
        &self,
        presigned_url: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), BackendError>;

    async fn register_image(
        &self,
        token: &str,
        request: &RegisterImageRequest,
    ) -> Result<RegisteredImage, BackendError>;

    /// Returns the raw caption payload, normally a JSON array.
    async fn generate_captions(
        &self,
        token: &str,
        request: &GenerateCaptionsRequest,
    ) -> Result<serde_json::Value, BackendError>;
}

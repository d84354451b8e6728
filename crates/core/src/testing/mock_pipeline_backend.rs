//! Mock caption pipeline backend for testing.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::pipeline::{
    BackendError, GenerateCaptionsRequest, PipelineBackend, PresignedUrlRequest,
    RegisterImageRequest, RegisteredImage, UploadTarget,
};

/// A recorded backend call for test assertions.
///
/// JSON request bodies are kept as serialized values so tests can check
/// exactly which keys went over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedPipelineCall {
    GeneratePresignedUrl { token: String, body: Value },
    UploadImage {
        presigned_url: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    RegisterImage { token: String, body: Value },
    GenerateCaptions { token: String, body: Value },
}

/// Scripted behavior for one step (1-based).
#[derive(Debug, Clone)]
enum StepBehavior {
    Status { status: u16, body: String },
    Fault(String),
    Delay(Duration),
}

/// Mock implementation of the PipelineBackend trait.
///
/// Every step succeeds by default. Individual steps can be scripted to
/// answer with an HTTP status, raise a transport fault, or stall. Scripts
/// persist across runs until [`MockPipelineBackend::reset_behavior`].
///
/// # Example
///
/// ```rust,ignore
/// use humorflow_core::testing::MockPipelineBackend;
///
/// let backend = MockPipelineBackend::new();
/// backend.fail_step(1, 500, "server error").await;
/// ```
#[derive(Debug)]
pub struct MockPipelineBackend {
    upload_target: Arc<RwLock<UploadTarget>>,
    image_id: Arc<RwLock<String>>,
    captions: Arc<RwLock<Value>>,
    behavior: Arc<RwLock<HashMap<usize, StepBehavior>>>,
    calls: Arc<RwLock<Vec<RecordedPipelineCall>>>,
}

impl Default for MockPipelineBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPipelineBackend {
    pub fn new() -> Self {
        Self {
            upload_target: Arc::new(RwLock::new(UploadTarget {
                presigned_url: "https://upload.test/presigned".to_string(),
                cdn_url: "https://cdn.test/image.png".to_string(),
            })),
            image_id: Arc::new(RwLock::new("img-1".to_string())),
            captions: Arc::new(RwLock::new(json!([{ "content": "mock caption" }]))),
            behavior: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    // =========================================================================
    // Response Configuration
    // =========================================================================

    pub async fn set_upload_target(&self, presigned_url: &str, cdn_url: &str) {
        *self.upload_target.write().await = UploadTarget {
            presigned_url: presigned_url.to_string(),
            cdn_url: cdn_url.to_string(),
        };
    }

    pub async fn set_image_id(&self, image_id: &str) {
        *self.image_id.write().await = image_id.to_string();
    }

    /// Raw payload returned by caption generation.
    pub async fn set_captions(&self, captions: Value) {
        *self.captions.write().await = captions;
    }

    // =========================================================================
    // Failure Injection
    // =========================================================================

    /// Make `step` (1-based) answer with a non-2xx status.
    pub async fn fail_step(&self, step: usize, status: u16, body: &str) {
        self.behavior.write().await.insert(
            step,
            StepBehavior::Status {
                status,
                body: body.to_string(),
            },
        );
    }

    /// Make `step` (1-based) raise a transport-level fault.
    pub async fn fault_step(&self, step: usize, message: &str) {
        self.behavior
            .write()
            .await
            .insert(step, StepBehavior::Fault(message.to_string()));
    }

    /// Make `step` (1-based) stall before succeeding.
    pub async fn delay_step(&self, step: usize, delay: Duration) {
        self.behavior
            .write()
            .await
            .insert(step, StepBehavior::Delay(delay));
    }

    pub async fn reset_behavior(&self) {
        self.behavior.write().await.clear();
    }

    // =========================================================================
    // Call Recording
    // =========================================================================

    pub async fn recorded_calls(&self) -> Vec<RecordedPipelineCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Body of the most recent registration call.
    pub async fn register_body(&self) -> Option<Value> {
        self.calls.read().await.iter().rev().find_map(|c| match c {
            RecordedPipelineCall::RegisterImage { body, .. } => Some(body.clone()),
            _ => None,
        })
    }

    /// Body of the most recent caption generation call.
    pub async fn captions_body(&self) -> Option<Value> {
        self.calls.read().await.iter().rev().find_map(|c| match c {
            RecordedPipelineCall::GenerateCaptions { body, .. } => Some(body.clone()),
            _ => None,
        })
    }

    async fn record(&self, call: RecordedPipelineCall) {
        self.calls.write().await.push(call);
    }

    /// Apply the scripted behavior for `step`, if any.
    async fn scripted(&self, step: usize) -> Result<(), BackendError> {
        let behavior = self.behavior.read().await.get(&step).cloned();
        match behavior {
            Some(StepBehavior::Status { status, body }) => {
                Err(BackendError::Status { status, body })
            }
            Some(StepBehavior::Fault(message)) => Err(BackendError::Transport(message)),
            Some(StepBehavior::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn to_value<T: Serialize>(body: &T) -> Value {
    serde_json::to_value(body).unwrap_or(Value::Null)
}

#[async_trait]
impl PipelineBackend for MockPipelineBackend {
    async fn generate_presigned_url(
        &self,
        token: &str,
        request: &PresignedUrlRequest,
    ) -> Result<UploadTarget, BackendError> {
        self.record(RecordedPipelineCall::GeneratePresignedUrl {
            token: token.to_string(),
            body: to_value(request),
        })
        .await;
        self.scripted(1).await?;
        Ok(self.upload_target.read().await.clone())
    }

    async fn upload_image(
        &self,
        presigned_url: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), BackendError> {
        self.record(RecordedPipelineCall::UploadImage {
            presigned_url: presigned_url.to_string(),
            content_type: content_type.to_string(),
            bytes: bytes.to_vec(),
        })
        .await;
        self.scripted(2).await
    }

    async fn register_image(
        &self,
        token: &str,
        request: &RegisterImageRequest,
    ) -> Result<RegisteredImage, BackendError> {
        self.record(RecordedPipelineCall::RegisterImage {
            token: token.to_string(),
            body: to_value(request),
        })
        .await;
        self.scripted(3).await?;
        Ok(RegisteredImage {
            image_id: self.image_id.read().await.clone(),
        })
    }

    async fn generate_captions(
        &self,
        token: &str,
        request: &GenerateCaptionsRequest,
    ) -> Result<Value, BackendError> {
        self.record(RecordedPipelineCall::GenerateCaptions {
            token: token.to_string(),
            body: to_value(request),
        })
        .await;
        self.scripted(4).await?;
        Ok(self.captions.read().await.clone())
    }
}

//! Request, result, and wire types for the caption pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A generated caption. The backend's shape is passed through untouched.
pub type Caption = serde_json::Value;

/// Step name of the synthetic entry appended on an unexpected fault.
pub const PIPELINE_ERROR_STEP: &str = "Pipeline error";

/// Input to a single pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Humor flavor selecting the prompt chain. Zero means "backend default".
    pub flavor_id: Option<i64>,
    pub image_bytes: Vec<u8>,
    pub image_mime_type: String,
    pub additional_context: Option<String>,
}

impl PipelineRequest {
    pub fn new(flavor_id: i64, image_bytes: Vec<u8>, image_mime_type: impl Into<String>) -> Self {
        Self {
            flavor_id: Some(flavor_id),
            image_bytes,
            image_mime_type: image_mime_type.into(),
            additional_context: None,
        }
    }

    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }

    /// Check the fields every run needs before anything goes over the wire.
    pub fn validate(&self) -> Result<(), RejectedRequest> {
        if self.flavor_id.is_none() {
            return Err(RejectedRequest::MissingFlavorId);
        }
        if self.image_bytes.is_empty() {
            return Err(RejectedRequest::MissingImage);
        }
        if self.image_mime_type.trim().is_empty() {
            return Err(RejectedRequest::MissingMimeType);
        }
        Ok(())
    }

    /// Flavor selector for caption generation; absent and zero both defer
    /// to the backend's default flavor.
    pub fn flavor_selector(&self) -> Option<i64> {
        self.flavor_id.filter(|id| *id != 0)
    }

    /// Context for image registration; an empty string counts as absent.
    pub fn context_for_registration(&self) -> Option<String> {
        self.additional_context
            .as_ref()
            .filter(|c| !c.is_empty())
            .cloned()
    }
}

/// Precondition failures. Raised before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectedRequest {
    #[error("flavorId is required")]
    MissingFlavorId,

    #[error("image bytes are required")]
    MissingImage,

    #[error("image MIME type is required")]
    MissingMimeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
}

/// Audit record of one attempted step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step: String,
    pub status: StepStatus,
    pub detail: String,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn success(step: impl Into<String>, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Success,
            detail: detail.into(),
            duration_ms,
        }
    }

    pub fn error(step: impl Into<String>, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            step: step.into(),
            status: StepStatus::Error,
            detail: detail.into(),
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Result of one pipeline run: the ordered step trail plus any captions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub steps: Vec<StepResult>,
    pub captions: Vec<Caption>,
}

impl PipelineOutcome {
    /// Outcome of a run that stopped early. Captions are always empty.
    pub fn halted(steps: Vec<StepResult>) -> Self {
        Self {
            steps,
            captions: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(StepResult::is_success)
    }

    /// The step that stopped the run, if any.
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.last().filter(|s| !s.is_success())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUrlRequest {
    pub content_type: String,
}

/// Write-once upload location and the public location it becomes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub presigned_url: String,
    pub cdn_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterImageRequest {
    pub image_url: String,
    pub is_common_use: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredImage {
    pub image_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCaptionsRequest {
    pub image_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humor_flavor_id: Option<i64>,
}

//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides a scripted stand-in for the remote caption
//! pipeline, allowing end-to-end runs without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use humorflow_core::testing::{fixtures, MockPipelineBackend};
//!
//! let backend = MockPipelineBackend::new();
//! backend.fail_step(4, 502, "Bad Gateway").await;
//!
//! let request = fixtures::pipeline_request(7);
//! // Hand the backend to a PipelineRunner...
//! ```

mod mock_pipeline_backend;

pub use mock_pipeline_backend::{MockPipelineBackend, RecordedPipelineCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::flavors::{FlavorInput, StepInput};
    use crate::pipeline::PipelineRequest;

    /// PNG signature plus a minimal IHDR chunk header.
    pub const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    /// A pipeline request for `flavor_id` carrying [`PNG_BYTES`].
    pub fn pipeline_request(flavor_id: i64) -> PipelineRequest {
        PipelineRequest::new(flavor_id, PNG_BYTES.to_vec(), "image/png")
    }

    pub fn flavor_input(slug: &str, description: &str) -> FlavorInput {
        FlavorInput {
            slug: slug.to_string(),
            description: Some(description.to_string()),
        }
    }

    /// A step with prompts filled in at position `order_by`.
    pub fn step_input(order_by: i64, user_prompt: &str) -> StepInput {
        StepInput {
            order_by: Some(order_by),
            llm_temperature: Some(0.7),
            llm_system_prompt: Some("You are a comedy writer.".to_string()),
            llm_user_prompt: Some(user_prompt.to_string()),
            description: Some(format!("Step {}", order_by)),
            ..Default::default()
        }
    }
}

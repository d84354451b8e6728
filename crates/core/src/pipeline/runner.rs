//! Step-by-step execution of a caption pipeline run.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{
    BackendError, Caption, GenerateCaptionsRequest, PipelineBackend, PipelineOutcome,
    PipelineRequest, PresignedUrlRequest, RegisterImageRequest, RejectedRequest, StepResult,
    UploadTarget, PIPELINE_ERROR_STEP,
};
use crate::metrics::{CAPTIONS_GENERATED, PIPELINE_RUNS, PIPELINE_STEP_DURATION};

/// Default per-step timeout.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// A pipeline stage together with the input it needs from the stage before.
///
/// Runs always move `AcquireUploadTarget -> TransferBytes -> RegisterImage
/// -> GenerateCaptions`; a failure at any stage ends the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    AcquireUploadTarget,
    TransferBytes(UploadTarget),
    RegisterImage { cdn_url: String },
    GenerateCaptions { image_id: String },
}

impl Stage {
    /// Name recorded in the step trail.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AcquireUploadTarget => "Generate presigned URL",
            Self::TransferBytes(_) => "Upload image",
            Self::RegisterImage { .. } => "Register image",
            Self::GenerateCaptions { .. } => "Generate captions",
        }
    }
}

enum Transition {
    Next(Stage),
    Done(Vec<Caption>),
}

/// Outcome of one stage's remote call, with the time the call took.
struct Attempt {
    result: Result<(String, Transition), BackendError>,
    duration_ms: u64,
}

/// Runs caption pipelines against a [`PipelineBackend`].
///
/// The runner holds no per-run state, so one instance serves any number
/// of concurrent runs.
pub struct PipelineRunner {
    backend: Arc<dyn PipelineBackend>,
    step_timeout: Duration,
}

impl PipelineRunner {
    pub fn new(backend: Arc<dyn PipelineBackend>) -> Self {
        Self {
            backend,
            step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_step_timeout(mut self, step_timeout: Duration) -> Self {
        self.step_timeout = step_timeout;
        self
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    /// Execute one run.
    ///
    /// Returns `Err` only when the request fails its preconditions, in
    /// which case no remote call was made. Once the first call is issued
    /// the run always produces an outcome: step failures and faults are
    /// reported in `steps`.
    pub async fn run(
        &self,
        request: &PipelineRequest,
        auth_token: &str,
    ) -> Result<PipelineOutcome, RejectedRequest> {
        if let Err(rejection) = request.validate() {
            PIPELINE_RUNS.with_label_values(&["rejected"]).inc();
            return Err(rejection);
        }

        info!(
            flavor_id = ?request.flavor_id,
            mime = %request.image_mime_type,
            bytes = request.image_bytes.len(),
            "Starting caption pipeline run"
        );

        let mut steps = Vec::with_capacity(4);
        let mut stage = Stage::AcquireUploadTarget;

        loop {
            let name = stage.name();
            let Attempt {
                result,
                duration_ms,
            } = self.attempt(stage, request, auth_token).await;

            match result {
                Ok((detail, transition)) => {
                    debug!(step = name, duration_ms, "Pipeline step succeeded");
                    observe_step(name, "success", duration_ms);
                    steps.push(StepResult::success(name, detail, duration_ms));

                    match transition {
                        Transition::Next(next) => stage = next,
                        Transition::Done(captions) => {
                            info!(captions = captions.len(), "Caption pipeline run completed");
                            PIPELINE_RUNS.with_label_values(&["success"]).inc();
                            CAPTIONS_GENERATED.observe(captions.len() as f64);
                            return Ok(PipelineOutcome { steps, captions });
                        }
                    }
                }
                Err(e) if e.is_step_failure() => {
                    warn!(step = name, duration_ms, error = %e, "Pipeline step failed");
                    observe_step(name, "error", duration_ms);
                    PIPELINE_RUNS.with_label_values(&["step_failed"]).inc();
                    steps.push(StepResult::error(name, e.to_string(), duration_ms));
                    return Ok(PipelineOutcome::halted(steps));
                }
                Err(e) => {
                    warn!(step = name, error = %e, "Pipeline run aborted by fault");
                    PIPELINE_RUNS.with_label_values(&["fault"]).inc();
                    steps.push(StepResult::error(PIPELINE_ERROR_STEP, e.to_string(), 0));
                    return Ok(PipelineOutcome::halted(steps));
                }
            }
        }
    }

    async fn attempt(&self, stage: Stage, request: &PipelineRequest, token: &str) -> Attempt {
        let backend = self.backend.as_ref();

        match stage {
            Stage::AcquireUploadTarget => {
                let body = PresignedUrlRequest {
                    content_type: request.image_mime_type.clone(),
                };
                self.timed(backend.generate_presigned_url(token, &body), |target| {
                    (target.cdn_url.clone(), Transition::Next(Stage::TransferBytes(target)))
                })
                .await
            }
            Stage::TransferBytes(UploadTarget {
                presigned_url,
                cdn_url,
            }) => {
                let upload = backend.upload_image(
                    &presigned_url,
                    &request.image_mime_type,
                    &request.image_bytes,
                );
                self.timed(upload, move |()| {
                    (
                        "Image uploaded to S3".to_string(),
                        Transition::Next(Stage::RegisterImage { cdn_url }),
                    )
                })
                .await
            }
            Stage::RegisterImage { cdn_url } => {
                let body = RegisterImageRequest {
                    image_url: cdn_url,
                    is_common_use: false,
                    additional_context: request.context_for_registration(),
                };
                self.timed(backend.register_image(token, &body), |image| {
                    (
                        format!("Image ID: {}", image.image_id),
                        Transition::Next(Stage::GenerateCaptions {
                            image_id: image.image_id,
                        }),
                    )
                })
                .await
            }
            Stage::GenerateCaptions { image_id } => {
                let body = GenerateCaptionsRequest {
                    image_id,
                    humor_flavor_id: request.flavor_selector(),
                };
                self.timed(backend.generate_captions(token, &body), |payload| {
                    let captions = match payload {
                        serde_json::Value::Array(items) => items,
                        _ => Vec::new(),
                    };
                    (
                        format!("{} captions generated", captions.len()),
                        Transition::Done(captions),
                    )
                })
                .await
            }
        }
    }

    /// Await a backend call under the step timeout, measuring only the call.
    async fn timed<T, F, M>(&self, call: F, on_success: M) -> Attempt
    where
        F: Future<Output = Result<T, BackendError>>,
        M: FnOnce(T) -> (String, Transition),
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.step_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.step_timeout)),
        };
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        Attempt {
            result: result.map(on_success),
            duration_ms,
        }
    }
}

fn observe_step(step: &str, status: &str, duration_ms: u64) {
    PIPELINE_STEP_DURATION
        .with_label_values(&[step, status])
        .observe(duration_ms as f64 / 1000.0);
}

//! Request executor: one structured-output call with capped exponential backoff.
//!
//! Every failure short of a missing image is recoverable. The default
//! [`RetryPolicy`] waits 1 s after the first failure, doubles the wait after
//! each further failure up to 30 s and never gives up. Callers that need a
//! terminal failure set [`RetryPolicy::max_attempts`], and callers that need to
//! abort pass a [`CancellationToken`] to [`execute_with`].

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::ai::{
    self, CaptionResult, ContentModel, Generated, GenerateRequest, ImageData, MetadataResult, Mode,
    RESPONSE_MIME_TYPE,
};
use crate::config::ControlSettings;
use crate::normalize::normalize_metadata;

/// Errors that end an execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("image data is missing")]
    MissingInput,
    #[error("request cancelled")]
    Cancelled,
    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: AttemptError },
}

/// Why a single attempt failed. Always retried.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("blocked by content safety")]
    SafetyBlocked,
    #[error("invalid response structure")]
    InvalidResponse,
    #[error("response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("request failed: {0:#}")]
    Transport(anyhow::Error),
}

/// Backoff and attempt limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on any single wait.
    pub max_delay: Duration,
    /// Total attempts before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next: self.initial_delay.min(self.max_delay),
            max: self.max_delay,
        }
    }
}

/// Successive wait times: doubling, capped at the policy maximum.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current.saturating_mul(2).min(self.max);
        Some(current)
    }
}

/// Generate metadata or a caption for `image`, retrying until it succeeds.
///
/// `on_retry` receives the wait before each retry, ahead of the sleep.
/// With no image the call fails immediately with [`ExecuteError::MissingInput`]
/// without touching the model.
///
/// # Example
///
/// ```rust,no_run
/// use stock_meta_ai::ai::{GeminiService, ImageData, Mode, build_prompt};
/// use stock_meta_ai::config::ControlSettings;
/// use stock_meta_ai::executor::execute;
///
/// # async fn example() -> anyhow::Result<()> {
/// let service = GeminiService::new("AIza...".into());
/// let settings = ControlSettings::default();
/// let prompt = build_prompt(&settings, Mode::Metadata);
/// let image = ImageData::from_bytes(&std::fs::read("photo.jpg")?, "image/jpeg");
///
/// let result = execute(
///     &service,
///     "gemini-2.5-flash",
///     &prompt,
///     Some(&image),
///     &settings,
///     Mode::Metadata,
///     |delay| eprintln!("retrying in {}s", delay.as_secs()),
/// )
/// .await?;
/// println!("{}", serde_json::to_string_pretty(&result)?);
/// # Ok(())
/// # }
/// ```
pub async fn execute<F>(
    model: &dyn ContentModel,
    model_id: &str,
    prompt: &str,
    image: Option<&ImageData>,
    settings: &ControlSettings,
    mode: Mode,
    on_retry: F,
) -> Result<Generated, ExecuteError>
where
    F: FnMut(Duration),
{
    execute_with(
        model,
        model_id,
        prompt,
        image,
        settings,
        mode,
        &RetryPolicy::default(),
        &CancellationToken::new(),
        on_retry,
    )
    .await
}

/// [`execute`] with an explicit retry policy and cancellation token.
///
/// Cancellation is observed while waiting on the model and while backing off.
#[allow(clippy::too_many_arguments)]
pub async fn execute_with<F>(
    model: &dyn ContentModel,
    model_id: &str,
    prompt: &str,
    image: Option<&ImageData>,
    settings: &ControlSettings,
    mode: Mode,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut on_retry: F,
) -> Result<Generated, ExecuteError>
where
    F: FnMut(Duration),
{
    let image = image.ok_or(ExecuteError::MissingInput)?;

    let request = GenerateRequest {
        model: model_id,
        prompt,
        image,
        schema: ai::response_schema(mode),
        response_mime_type: RESPONSE_MIME_TYPE,
    };

    let mut backoff = policy.backoff();
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ExecuteError::Cancelled);
        }
        attempts += 1;

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(ExecuteError::Cancelled),
            outcome = attempt(model, &request, settings, mode) => outcome,
        };

        let err = match outcome {
            Ok(result) => {
                if attempts > 1 {
                    log::info!("{} succeeded after {attempts} attempts", model.name());
                }
                return Ok(result);
            }
            Err(err) => err,
        };

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            log::warn!("{} call failed ({err}); no attempts left", model.name());
            return Err(ExecuteError::RetriesExhausted { attempts, last: err });
        }

        let delay = backoff.next().unwrap_or(policy.max_delay);
        log::warn!(
            "{} call failed ({err}). Retrying in {:.1}s...",
            model.name(),
            delay.as_secs_f64()
        );
        on_retry(delay);

        tokio::select! {
            _ = cancel.cancelled() => return Err(ExecuteError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// One request/decode round.
async fn attempt(
    model: &dyn ContentModel,
    request: &GenerateRequest<'_>,
    settings: &ControlSettings,
    mode: Mode,
) -> Result<Generated, AttemptError> {
    let response = model.generate(request).await.map_err(AttemptError::Transport)?;

    let Some(text) = response.text.as_deref() else {
        if response.is_safety_block() {
            log::debug!("Safety block: {response:?}");
            return Err(AttemptError::SafetyBlocked);
        }
        log::debug!("No text in response: {response:?}");
        return Err(AttemptError::InvalidResponse);
    };

    match mode {
        Mode::Metadata => {
            let metadata: MetadataResult = ai::parse::parse_model_json(text)?;
            Ok(Generated::Metadata(normalize_metadata(metadata, settings)))
        }
        Mode::Caption => {
            let caption: CaptionResult = ai::parse::parse_model_json(text)?;
            Ok(Generated::Caption(caption))
        }
    }
}

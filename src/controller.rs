use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::client::{AltTextClient, ClientError};
use crate::models::{AltTextResponse, FormView, ImageUpload, Outcome, Phase, WordLimit};

pub const NO_ALT_TEXT: &str = "No alt text generated.";
pub const FETCH_FAILED: &str = "Error: Failed to fetch alt text";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("Please select an image file.")]
    NoFile,
    #[error("Alt text is already being generated")]
    AlreadySubmitting,
}

/// Fields carried by one posted form. `file` is `None` when the file input
/// was left empty.
#[derive(Debug, Default)]
pub struct Submission {
    pub file: Option<ImageUpload>,
    pub word_limit: Option<String>,
}

#[derive(Default)]
struct FormState {
    file: Option<ImageUpload>,
    word_limit: WordLimit,
    alt_text: String,
    phase: Phase,
    last_outcome: Option<Outcome>,
    cancel: Option<CancellationToken>,
}

struct Started {
    upload: ImageUpload,
    word_limit: WordLimit,
    cancel: CancellationToken,
}

/// State and submit logic behind the upload form.
///
/// The lock is only held while reading or writing state, never across the
/// outbound request, so `snapshot` and `cancel` stay responsive mid-submit.
pub struct UploadForm {
    client: AltTextClient,
    state: Mutex<FormState>,
}

impl UploadForm {
    pub fn new(client: AltTextClient) -> Self {
        Self {
            client,
            state: Mutex::new(FormState::default()),
        }
    }

    /// Resends the current selection, as a retry after a failure.
    pub async fn submit(&self) -> Result<Outcome, SubmitError> {
        let started = {
            let mut state = self.state.lock().await;
            let Some(upload) = state.file.clone() else {
                tracing::warn!("submit without a selected image");
                return Err(SubmitError::NoFile);
            };
            start(&mut state, upload)?
        };
        Ok(self.run(started).await)
    }

    /// Submits one posted form. Nothing is stored unless the request is
    /// actually sent: a form without a file, or one posted while another
    /// request is in flight, leaves the state as it was.
    pub async fn submit_form(&self, submission: Submission) -> Result<Outcome, SubmitError> {
        let started = {
            let mut state = self.state.lock().await;
            let Some(upload) = submission.file else {
                tracing::warn!("form posted without an image");
                return Err(SubmitError::NoFile);
            };
            if state.phase == Phase::Submitting {
                tracing::warn!(file = %upload.file_name, "form rejected, request already in flight");
                return Err(SubmitError::AlreadySubmitting);
            }
            if let Some(raw) = submission.word_limit.as_deref() {
                apply_word_limit(&mut state, raw);
            }
            state.file = Some(upload.clone());
            start(&mut state, upload)?
        };
        Ok(self.run(started).await)
    }

    async fn run(&self, started: Started) -> Outcome {
        let Started {
            upload,
            word_limit,
            cancel,
        } = started;

        tracing::info!(
            file = %upload.file_name,
            word_limit = word_limit.value(),
            endpoint = %self.client.endpoint(),
            "requesting alt text"
        );

        let result = self.client.generate(&upload, word_limit, &cancel).await;

        // Checked under the lock so a `cancel` that reported true always wins.
        let mut state = self.state.lock().await;
        let (outcome, alt_text) = settle(result, cancel.is_cancelled());
        state.alt_text = alt_text;
        state.last_outcome = Some(outcome);
        state.phase = Phase::Idle;
        state.cancel = None;
        outcome
    }

    /// Aborts the in-flight request. Returns whether there was one; when it
    /// returns true the submit records a failure even if a response had
    /// already arrived.
    pub async fn cancel(&self) -> bool {
        let state = self.state.lock().await;
        match &state.cancel {
            Some(token) => {
                tracing::info!("cancelling alt text request");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn snapshot(&self) -> FormView {
        let state = self.state.lock().await;
        FormView {
            file_name: state.file.as_ref().map(|f| f.file_name.clone()),
            word_limit: state.word_limit,
            word_limit_display: state.word_limit.display(),
            alt_text: state.alt_text.clone(),
            loading: state.phase == Phase::Submitting,
            phase: state.phase,
            last_outcome: state.last_outcome,
        }
    }
}

fn apply_word_limit(state: &mut FormState, raw: &str) -> bool {
    match WordLimit::parse(raw) {
        Some(limit) => {
            state.word_limit = limit;
            true
        }
        None => {
            tracing::debug!(input = raw, "ignoring unparsable word limit");
            false
        }
    }
}

fn start(state: &mut FormState, upload: ImageUpload) -> Result<Started, SubmitError> {
    if state.phase == Phase::Submitting {
        tracing::warn!("submit rejected, request already in flight");
        return Err(SubmitError::AlreadySubmitting);
    }
    let cancel = CancellationToken::new();
    state.phase = Phase::Submitting;
    state.cancel = Some(cancel.clone());
    Ok(Started {
        upload,
        word_limit: state.word_limit,
        cancel,
    })
}

/// Turns the request result into the outcome and text to display.
fn settle(result: Result<AltTextResponse, ClientError>, cancelled: bool) -> (Outcome, String) {
    match result {
        Ok(_) if cancelled => {
            tracing::info!("response arrived after cancel, discarding");
            (Outcome::Failure, FETCH_FAILED.to_string())
        }
        Ok(response) => {
            let text = response.text().unwrap_or_else(|| NO_ALT_TEXT.to_string());
            tracing::info!(chars = text.len(), "alt text received");
            (Outcome::Success, text)
        }
        Err(e) => {
            log_failure(&e);
            (Outcome::Failure, FETCH_FAILED.to_string())
        }
    }
}

fn log_failure(e: &ClientError) {
    match e {
        ClientError::Upstream { status, detail } => tracing::warn!(
            status,
            detail = detail.as_deref().unwrap_or(""),
            "alt text service returned an error"
        ),
        ClientError::Cancelled => tracing::info!("alt text request cancelled"),
        other => tracing::warn!(error = %other, "alt text request failed"),
    }
}

//! Upload dialog state machine
//!
//! `Upload -> Processing -> Preview`; any failure goes back to `Upload` with
//! a message for the user. Submission is never retried automatically.

use client::{ApiClient, ApiError, UploadFile};
use common::{JobId, MediaJob};
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::{info, warn};

use crate::poller::{JobOutcome, JobPoller, PollEvent, PollPolicy};

/// What the user asked to clean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Audio-only upload
    Audio,
    /// Video upload, clean the soundtrack only
    CleanAudio,
    /// Video upload, clean the picture only
    CleanVideo,
    /// Video upload, clean both
    #[default]
    Full,
}

impl FilterMode {
    pub const ALL: [FilterMode; 4] = [
        FilterMode::Audio,
        FilterMode::CleanAudio,
        FilterMode::CleanVideo,
        FilterMode::Full,
    ];

    /// `(filter_audio, filter_video)` sent to the backend
    pub fn flags(self) -> (bool, bool) {
        match self {
            FilterMode::Audio | FilterMode::CleanAudio => (true, false),
            FilterMode::CleanVideo => (false, true),
            FilterMode::Full => (true, true),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::Audio => "audio",
            FilterMode::CleanAudio => "clean-audio",
            FilterMode::CleanVideo => "clean-video",
            FilterMode::Full => "full",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown filter mode: {s}"))
    }
}

#[derive(Debug, Clone)]
pub enum FlowState {
    /// Waiting for a file; carries the last failure, if any
    Upload { error: Option<String> },
    /// The job was accepted and is being watched
    Processing { job_id: JobId },
    /// The job finished; ready for preview
    Preview(MediaJob),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FlowError {
    #[error("A submission is already in progress")]
    Busy,
}

#[derive(Debug)]
pub struct SubmissionFlow {
    mode: FilterMode,
    state: FlowState,
}

impl SubmissionFlow {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            state: FlowState::Upload { error: None },
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Last failure shown on the upload screen
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            FlowState::Upload { error } => error.as_deref(),
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&MediaJob> {
        match &self.state {
            FlowState::Preview(job) => Some(job),
            _ => None,
        }
    }

    /// Back to a clean upload screen
    pub fn reset(&mut self) {
        self.state = FlowState::Upload { error: None };
    }

    /// The backend accepted the upload.
    ///
    /// Returns `true` when the job still has to be polled; a job that is
    /// already terminal goes straight to its outcome.
    pub fn accepted(&mut self, job: MediaJob) -> Result<bool, FlowError> {
        if matches!(self.state, FlowState::Processing { .. }) {
            return Err(FlowError::Busy);
        }

        match JobOutcome::from_terminal(job.clone()) {
            Some(outcome) => {
                info!("Job {} was already finished on submission", job.id);
                self.finish(outcome);
                Ok(false)
            }
            None => {
                self.state = FlowState::Processing { job_id: job.id };
                Ok(true)
            }
        }
    }

    /// The upload request itself failed
    pub fn rejected(&mut self, error: &ApiError) {
        let message = if error.is_unauthorized() {
            error.to_string()
        } else {
            format!("Processing failed: {error}")
        };
        warn!("{}", message);
        self.state = FlowState::Upload {
            error: Some(message),
        };
    }

    /// The poll loop ended
    pub fn finish(&mut self, outcome: JobOutcome) {
        self.state = match outcome {
            JobOutcome::Completed(job) => FlowState::Preview(job),
            other => FlowState::Upload {
                error: other.user_message(),
            },
        };
    }

    /// Upload `file`, watch the job to completion and settle the state.
    ///
    /// `on_event` sees every poll event as it arrives.
    pub async fn run<F>(
        &mut self,
        client: &ApiClient,
        file: UploadFile,
        subtitles: Option<UploadFile>,
        policy: PollPolicy,
        mut on_event: F,
    ) -> &FlowState
    where
        F: FnMut(&PollEvent),
    {
        if matches!(self.state, FlowState::Processing { .. }) {
            return &self.state;
        }

        let (filter_audio, filter_video) = self.mode.flags();
        let job = match client
            .submit_with_subtitles(file, filter_audio, filter_video, subtitles)
            .await
        {
            Ok(job) => job,
            Err(e) => {
                self.rejected(&e);
                return &self.state;
            }
        };

        let job_id = job.id;
        match self.accepted(job) {
            Ok(true) => {}
            Ok(false) | Err(_) => return &self.state,
        }

        let (handle, mut events) = JobPoller::start(client.clone(), job_id, policy);
        while let Some(event) = events.recv().await {
            on_event(&event);
            if let PollEvent::Finished(outcome) = event {
                self.finish(outcome);
                return &self.state;
            }
        }

        // Channel closed without a Finished event
        let outcome = handle.wait().await;
        self.finish(outcome);
        &self.state
    }
}

//! Poll loop for a submitted job
//!
//! [`JobPoller::start`] spawns one task per job. The task sleeps for the
//! policy interval, fetches the job, publishes what it saw and stops exactly
//! when the job reaches a terminal status, the backend rejects the session,
//! too many consecutive ticks fail, or the [`PollHandle`] is cancelled.

use client::ApiError;
use common::{JobId, JobStatus, MediaJob, PollSettings};
use std::time::Duration;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, info, warn};

use crate::source::JobSource;

/// Timing and give-up rules for the poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay between two ticks while the backend answers
    pub interval: Duration,
    /// Ceiling for the doubled delay after failed ticks
    pub max_backoff: Duration,
    /// Consecutive failed ticks after which the loop gives up
    pub max_consecutive_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollSettings::default())
    }
}

impl From<&PollSettings> for PollPolicy {
    fn from(settings: &PollSettings) -> Self {
        Self {
            interval: settings.interval,
            max_backoff: settings.max_backoff,
            max_consecutive_failures: settings.max_consecutive_failures,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            max_backoff: interval.max(Duration::from_millis(30_000)),
            ..Self::default()
        }
    }

    /// Delay before the next tick given the current run of failures.
    ///
    /// `interval * 2^failures`, never more than `max_backoff` (nor less
    /// than `interval`).
    pub fn delay_after(&self, failures: u32) -> Duration {
        let ceiling = self.max_backoff.max(self.interval);
        let factor = 1u32.checked_shl(failures.min(16)).unwrap_or(u32::MAX);
        self.interval.saturating_mul(factor).min(ceiling)
    }
}

/// How a poll loop ended
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// The backend finished the job
    Completed(MediaJob),
    /// The backend reported the job failed
    Failed { job: MediaJob, message: String },
    /// The session token was rejected; polling stopped and the user must sign in
    SignInRequired,
    /// Too many consecutive ticks failed; the job is treated as failed locally
    GaveUp { message: String },
    /// The caller stopped observing the job
    Cancelled,
}

impl JobOutcome {
    /// Outcome for a job that is already terminal
    pub fn from_terminal(job: MediaJob) -> Option<Self> {
        match job.status {
            JobStatus::Done => Some(JobOutcome::Completed(job)),
            JobStatus::Failed => {
                let message = job
                    .error_message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Processing failed".to_string());
                Some(JobOutcome::Failed { job, message })
            }
            JobStatus::Created | JobStatus::Processing => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }

    /// Message to show the user, `None` on success
    pub fn user_message(&self) -> Option<String> {
        match self {
            JobOutcome::Completed(_) => None,
            JobOutcome::Failed { message, .. } => Some(message.clone()),
            JobOutcome::SignInRequired => Some(ApiError::Unauthorized.to_string()),
            JobOutcome::GaveUp { message } => Some(message.clone()),
            JobOutcome::Cancelled => Some("Stopped watching the job".to_string()),
        }
    }
}

/// What the poll loop observed
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A tick returned the job, terminal or not
    Update(MediaJob),
    /// A tick failed; `attempt` counts consecutive failures
    TickFailed { attempt: u32, message: String },
    /// Sent exactly once, last
    Finished(JobOutcome),
}

/// Handle over a running poll loop.
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct PollHandle {
    job_id: JobId,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<JobOutcome>>,
}

impl PollHandle {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Stop polling; safe to call any number of times
    pub fn cancel(&self) {
        if !self.cancel.send_replace(true) {
            debug!("Cancelling poll loop for job {}", self.job_id);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the loop to end
    pub async fn wait(mut self) -> JobOutcome {
        let Some(task) = self.task.take() else {
            return JobOutcome::Cancelled;
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => JobOutcome::GaveUp {
                message: format!("Poll task stopped unexpectedly: {e}"),
            },
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel();
        }
    }
}

/// Starts poll loops
pub struct JobPoller;

impl JobPoller {
    /// Spawn the poll loop for `job_id`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start<S: JobSource>(
        source: S,
        job_id: JobId,
        policy: PollPolicy,
    ) -> (PollHandle, mpsc::UnboundedReceiver<PollEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        info!(
            "Polling job {} every {:?} (max {} consecutive failures)",
            job_id, policy.interval, policy.max_consecutive_failures
        );

        let task = tokio::spawn(async move {
            let outcome = run(source, job_id, &policy, &events_tx, cancel_rx).await;
            let _ = events_tx.send(PollEvent::Finished(outcome.clone()));
            outcome
        });

        let handle = PollHandle {
            job_id,
            cancel: cancel_tx,
            task: Some(task),
        };

        (handle, events_rx)
    }
}

async fn run<S: JobSource>(
    source: S,
    job_id: JobId,
    policy: &PollPolicy,
    events: &mpsc::UnboundedSender<PollEvent>,
    mut cancelled: watch::Receiver<bool>,
) -> JobOutcome {
    let mut failures = 0u32;

    loop {
        let delay = policy.delay_after(failures);

        let result = tokio::select! {
            _ = cancelled.wait_for(|c| *c) => {
                info!("Stopped polling job {}", job_id);
                return JobOutcome::Cancelled;
            }
            result = async {
                sleep(delay).await;
                source.fetch_job(job_id).await
            } => result,
        };

        match result {
            Ok(job) => {
                failures = 0;
                debug!(
                    "Job {} is {} at {}% ({})",
                    job_id,
                    job.status,
                    job.progress_percent(),
                    job.activity()
                );
                let _ = events.send(PollEvent::Update(job.clone()));

                if let Some(outcome) = JobOutcome::from_terminal(job) {
                    info!("Job {} reached a terminal status", job_id);
                    return outcome;
                }
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Session rejected while polling job {}", job_id);
                return JobOutcome::SignInRequired;
            }
            Err(e) => {
                failures += 1;
                warn!(
                    "Poll tick for job {} failed (attempt {}/{}): {}",
                    job_id, failures, policy.max_consecutive_failures, e
                );
                let _ = events.send(PollEvent::TickFailed {
                    attempt: failures,
                    message: e.to_string(),
                });

                if failures >= policy.max_consecutive_failures {
                    return JobOutcome::GaveUp {
                        message: format!(
                            "Lost contact with the server after {failures} attempts: {e}"
                        ),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use client::ApiResult;
    use common::InputType;
    use std::{
        collections::VecDeque,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use tokio::time::Instant;

    #[derive(Debug, Clone)]
    enum Step {
        Job(JobStatus, u32),
        Transient,
        Unauthorized,
    }

    #[derive(Clone)]
    struct ScriptedSource {
        script: Arc<Mutex<VecDeque<Step>>>,
        calls: Arc<AtomicUsize>,
        call_times: Arc<Mutex<Vec<Instant>>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                script: Arc::new(Mutex::new(steps.into())),
                calls: Arc::new(AtomicUsize::new(0)),
                call_times: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn job(id: JobId, status: JobStatus, progress: u32) -> MediaJob {
        MediaJob {
            id,
            input_path: "clip.mp4".into(),
            output_path: None,
            input_type: InputType::Video,
            filter_audio: true,
            filter_video: false,
            status,
            progress,
            current_activity: None,
            logs: Vec::new(),
            error_message: (status == JobStatus::Failed).then(|| "ffmpeg crashed".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            segments: Vec::new(),
        }
    }

    impl JobSource for ScriptedSource {
        async fn fetch_job(&self, id: JobId) -> ApiResult<MediaJob> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times.lock().unwrap().push(Instant::now());

            let step = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front()
                } else {
                    script.front().cloned()
                }
            };

            match step.unwrap_or(Step::Job(JobStatus::Processing, 0)) {
                Step::Job(status, progress) => Ok(job(id, status, progress)),
                Step::Transient => Err(ApiError::Decode("connection reset".into())),
                Step::Unauthorized => Err(ApiError::Unauthorized),
            }
        }
    }

    fn policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(2),
            max_backoff: Duration::from_secs(16),
            max_consecutive_failures: 3,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PollEvent>) -> Vec<PollEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_backoff_doubles_and_is_bounded() {
        let policy = policy();
        assert_eq!(policy.delay_after(0), Duration::from_secs(2));
        assert_eq!(policy.delay_after(1), Duration::from_secs(4));
        assert_eq!(policy.delay_after(2), Duration::from_secs(8));
        assert_eq!(policy.delay_after(3), Duration::from_secs(16));
        assert_eq!(policy.delay_after(4), Duration::from_secs(16));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(16));
    }

    #[test]
    fn test_policy_from_settings() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(2000));
        assert_eq!(policy.max_backoff, Duration::from_millis(30_000));
        assert_eq!(policy.max_consecutive_failures, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_at_terminal_status() {
        let source = ScriptedSource::new(vec![
            Step::Job(JobStatus::Processing, 0),
            Step::Job(JobStatus::Processing, 20),
            Step::Job(JobStatus::Processing, 55),
            Step::Job(JobStatus::Processing, 95),
            Step::Job(JobStatus::Done, 100),
        ]);

        let (handle, mut rx) = JobPoller::start(source.clone(), 7, policy());
        let outcome = handle.wait().await;

        assert!(outcome.is_completed());
        assert_eq!(source.calls(), 5);

        // No orphaned timer keeps calling the backend
        sleep(Duration::from_secs(120)).await;
        assert_eq!(source.calls(), 5);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 6);
        assert!(matches!(events.last(), Some(PollEvent::Finished(JobOutcome::Completed(_)))));
        let finished = events
            .iter()
            .filter(|e| matches!(e, PollEvent::Finished(_)))
            .count();
        assert_eq!(finished, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_reports_backend_message() {
        let source = ScriptedSource::new(vec![
            Step::Job(JobStatus::Processing, 10),
            Step::Job(JobStatus::Failed, 10),
        ]);

        let (handle, _rx) = JobPoller::start(source.clone(), 3, policy());
        match handle.wait().await {
            JobOutcome::Failed { job, message } => {
                assert_eq!(job.id, 3);
                assert_eq!(message, "ffmpeg crashed");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_does_not_stop_polling() {
        let source = ScriptedSource::new(vec![
            Step::Job(JobStatus::Processing, 10),
            Step::Transient,
            Step::Transient,
            Step::Job(JobStatus::Processing, 60),
            Step::Job(JobStatus::Done, 100),
        ]);

        let (handle, mut rx) = JobPoller::start(source.clone(), 1, policy());
        assert!(handle.wait().await.is_completed());
        assert_eq!(source.calls(), 5);

        let attempts: Vec<u32> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                PollEvent::TickFailed { attempt, .. } => Some(attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2]);

        // 2s, then 2s, then 4s and 8s of backoff, then back to 2s
        let times = source.call_times.lock().unwrap().clone();
        let gaps: Vec<u64> = times.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect();
        assert_eq!(gaps, vec![2, 4, 8, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_consecutive_failures() {
        let source = ScriptedSource::new(vec![Step::Transient]);

        let (handle, _rx) = JobPoller::start(source.clone(), 1, policy());
        let outcome = handle.wait().await;

        match &outcome {
            JobOutcome::GaveUp { message } => assert!(message.contains("after 3 attempts")),
            other => panic!("expected GaveUp, got {other:?}"),
        }
        assert!(outcome.user_message().is_some());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_stops_immediately() {
        let source = ScriptedSource::new(vec![
            Step::Job(JobStatus::Processing, 10),
            Step::Job(JobStatus::Processing, 20),
            Step::Unauthorized,
            Step::Job(JobStatus::Done, 100),
        ]);

        let (handle, _rx) = JobPoller::start(source.clone(), 1, policy());
        let outcome = handle.wait().await;

        assert!(matches!(outcome, JobOutcome::SignInRequired));
        assert!(outcome.user_message().unwrap().contains("please sign in again"));
        sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent_and_stops_ticks() {
        let source = ScriptedSource::new(vec![Step::Job(JobStatus::Processing, 5)]);

        let (handle, mut rx) = JobPoller::start(source.clone(), 1, policy());
        sleep(Duration::from_millis(4500)).await;
        assert_eq!(source.calls(), 2);

        handle.cancel();
        handle.cancel();
        let outcome = handle.wait().await;
        assert!(matches!(outcome, JobOutcome::Cancelled));

        sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 2);

        let finished = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, PollEvent::Finished(JobOutcome::Cancelled)))
            .count();
        assert_eq!(finished, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let source = ScriptedSource::new(vec![Step::Job(JobStatus::Processing, 5)]);

        let (handle, mut rx) = JobPoller::start(source.clone(), 1, policy());
        sleep(Duration::from_millis(2500)).await;
        drop(handle);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 1);

        let last = drain(&mut rx).pop();
        assert!(matches!(last, Some(PollEvent::Finished(JobOutcome::Cancelled))));
    }

    #[test]
    fn test_outcome_from_terminal() {
        assert!(JobOutcome::from_terminal(job(1, JobStatus::Processing, 5)).is_none());
        assert!(JobOutcome::from_terminal(job(1, JobStatus::Done, 100)).unwrap().is_completed());

        let mut failed = job(1, JobStatus::Failed, 5);
        failed.error_message = None;
        match JobOutcome::from_terminal(failed) {
            Some(JobOutcome::Failed { message, .. }) => assert_eq!(message, "Processing failed"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}

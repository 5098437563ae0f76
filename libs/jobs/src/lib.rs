//! Job submission, polling and progress projection
//!
//! - [`poller`]: cancellable poll loop with bounded backoff
//! - [`projector`]: stage classification and per-poll view state
//! - [`progress`]: smoothed progress for display
//! - [`submission`]: the upload/processing/preview state machine

pub mod poller;
pub mod progress;
pub mod projector;
pub mod source;
pub mod submission;

pub use poller::{JobOutcome, JobPoller, PollEvent, PollHandle, PollPolicy};
pub use progress::{SmoothingParams, VisualProgress, smooth};
pub use projector::{ProcessingProjector, ProcessingView, Stage, StepStatus, stage_for};
pub use source::JobSource;
pub use submission::{FilterMode, FlowState, SubmissionFlow};

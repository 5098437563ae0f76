//! Maps backend progress and activity text onto user-facing stages

use chrono::Duration;
use common::{JobStatus, MediaJob};
use std::fmt;

/// Coarse pipeline stage shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Analyzing,
    Detecting,
    Filtering,
    Rendering,
}

impl Stage {
    /// Every stage in pipeline order
    pub const ALL: [Stage; 4] = [
        Stage::Analyzing,
        Stage::Detecting,
        Stage::Filtering,
        Stage::Rendering,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Analyzing => "Analyzing",
            Stage::Detecting => "Detecting",
            Stage::Filtering => "Filtering",
            Stage::Rendering => "Rendering",
        }
    }

    /// Lowercase fragments of activity text belonging to this stage
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Stage::Analyzing => &["analy", "queued", "starting", "extract", "configur"],
            Stage::Detecting => &["detect", "identif", "transcri", "scan"],
            Stage::Filtering => &["filter", "mut", "blur", "censor", "redact"],
            Stage::Rendering => &["render", "encod", "mux", "finaliz", "complet"],
        }
    }

    /// Stage bucket for a raw progress value
    fn for_progress(progress: u32) -> Stage {
        match progress {
            90.. => Stage::Rendering,
            50.. => Stage::Filtering,
            20.. => Stage::Detecting,
            _ => Stage::Analyzing,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stage named by the activity text, first match in stage order
pub fn classify(activity: &str) -> Option<Stage> {
    let activity = activity.to_lowercase();
    Stage::ALL.into_iter().find(|stage| {
        stage
            .keywords()
            .iter()
            .any(|keyword| activity.contains(keyword))
    })
}

/// Stage for one poll; total and deterministic
pub fn stage_for(progress: u32, activity: &str) -> Stage {
    classify(activity).unwrap_or_else(|| Stage::for_progress(progress))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Active,
    Pending,
}

/// Everything the processing view renders for one poll
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingView {
    pub stage: Stage,
    /// Status of every stage, in pipeline order
    pub steps: [(Stage, StepStatus); 4],
    /// Raw backend progress, 0..=100
    pub progress: u32,
    pub activity: String,
    /// Log lines not seen by a previous poll
    pub new_logs: Vec<String>,
    pub elapsed: Duration,
    /// The stage differs from the previous poll's
    pub stage_changed: bool,
}

impl ProcessingView {
    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.elapsed)
    }
}

/// Turns successive polls of one job into [`ProcessingView`]s
#[derive(Debug, Default)]
pub struct ProcessingProjector {
    seen_logs: usize,
    last_stage: Option<Stage>,
}

impl ProcessingProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_stage(&self) -> Option<Stage> {
        self.last_stage
    }

    pub fn observe(&mut self, job: &MediaJob) -> ProcessingView {
        let progress = job.progress_percent();
        let stage = stage_for(progress, job.activity());
        let finished = job.status == JobStatus::Done;

        let steps = Stage::ALL.map(|s| {
            let status = if finished || s < stage {
                StepStatus::Done
            } else if s == stage {
                StepStatus::Active
            } else {
                StepStatus::Pending
            };
            (s, status)
        });

        let new_logs = job.logs.get(self.seen_logs..).unwrap_or_default().to_vec();
        self.seen_logs = self.seen_logs.max(job.logs.len());

        let stage_changed = self.last_stage != Some(stage);
        self.last_stage = Some(stage);

        ProcessingView {
            stage,
            steps,
            progress,
            activity: job.activity().to_string(),
            new_logs,
            elapsed: job.elapsed(),
            stage_changed,
        }
    }
}

/// `42s`, `3m 07s` or `1h 02m 09s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

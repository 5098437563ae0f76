//! Media job models for the processing API

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// Backend-assigned job identifier
pub type JobId = i64;

/// Lifecycle status of a media job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    /// Get the status name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Terminal statuses are never left again; polling stops on them
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" => Ok(JobStatus::Created),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Kind of media a job was submitted with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Audio,
    Video,
}

impl InputType {
    /// Classify a file by extension the same way the backend does.
    /// Unknown extensions are treated as video.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "wav" | "mp3" | "flac" | "m4a" => InputType::Audio,
            _ => InputType::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Audio => "audio",
            InputType::Video => "video",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Redaction applied to a segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Mute,
    Blur,
    Other(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::Mute => "mute",
            ActionType::Blur => "blur",
            ActionType::Other(name) => name,
        }
    }
}

impl From<String> for ActionType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "mute" => ActionType::Mute,
            "blur" => ActionType::Blur,
            _ => ActionType::Other(value),
        }
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        value.as_str().to_string()
    }
}

/// Which file of a job is referenced by a download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Original,
    #[default]
    Processed,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Original => "original",
            Variant::Processed => "processed",
        }
    }

    /// The other variant, used when toggling a comparison view
    pub fn toggled(&self) -> Self {
        match self {
            Variant::Original => Variant::Processed,
            Variant::Processed => Variant::Original,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "original" => Ok(Variant::Original),
            "processed" => Ok(Variant::Processed),
            other => Err(format!("unknown variant: {other}")),
        }
    }
}

/// One filtered span within a job's media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    /// Inclusive start in milliseconds
    pub start_ms: u64,
    /// Exclusive end in milliseconds
    pub end_ms: u64,
    pub action_type: ActionType,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Segment {
    /// A segment is usable when `start_ms < end_ms`
    pub fn is_valid(&self) -> bool {
        self.start_ms < self.end_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Media job record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaJob {
    pub id: JobId,
    pub input_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    pub input_type: InputType,
    pub filter_audio: bool,
    pub filter_video: bool,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub current_activity: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub logs: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub segments: Vec<Segment>,
}

impl MediaJob {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Backend progress clamped to 0..=100
    pub fn progress_percent(&self) -> u32 {
        self.progress.min(100)
    }

    /// Current pipeline activity, empty when the backend sent none
    pub fn activity(&self) -> &str {
        self.current_activity.as_deref().unwrap_or("")
    }

    /// Time spent between submission and the last backend update
    pub fn elapsed(&self) -> Duration {
        (self.updated_at - self.created_at).max(Duration::zero())
    }
}

/// Response for media listing with pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaListResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub skip: u32,
    #[serde(default)]
    pub limit: u32,
    pub items: Vec<MediaJob>,
}

/// Aggregate counters from `/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_media: u64,
    pub total_segments: u64,
    #[serde(default)]
    pub by_status: std::collections::BTreeMap<String, u64>,
    #[serde(default)]
    pub by_type: std::collections::BTreeMap<String, u64>,
}

/// Raw output file listed by `/outputs/files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFileResponse {
    pub filename: String,
    #[serde(with = "timestamp")]
    pub modified_at: DateTime<Utc>,
}

/// Response from `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Generic `{message}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps as emitted by the backend: RFC 3339, or naive ISO 8601 in UTC
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Ok(parsed.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB_JSON: &str = r#"{
        "id": 42,
        "input_path": "clip.mp4",
        "output_path": null,
        "input_type": "video",
        "filter_audio": true,
        "filter_video": false,
        "status": "processing",
        "progress": 55,
        "current_activity": "Detecting profanity",
        "logs": null,
        "error_message": null,
        "created_at": "2025-06-01T12:00:00.250000",
        "updated_at": "2025-06-01T12:01:30.250000+00:00",
        "segments": [
            {"id": 1, "start_ms": 0, "end_ms": 1000, "action_type": "mute", "reason": "profanity"},
            {"id": 2, "start_ms": 1000, "end_ms": 2000, "action_type": "pixelate"}
        ]
    }"#;

    #[test]
    fn test_media_job_deserializes_backend_payload() {
        let job: MediaJob = serde_json::from_str(JOB_JSON).unwrap();

        assert_eq!(job.id, 42);
        assert_eq!(job.status, JobStatus::Processing);
        assert!(!job.is_terminal());
        assert!(job.logs.is_empty());
        assert_eq!(job.activity(), "Detecting profanity");
        assert_eq!(job.segments.len(), 2);
        assert_eq!(job.segments[0].action_type, ActionType::Mute);
        assert_eq!(
            job.segments[1].action_type,
            ActionType::Other("pixelate".to_string())
        );
        assert_eq!(job.segments[1].reason, None);
        assert_eq!(job.elapsed(), Duration::seconds(90));
    }

    #[test]
    fn test_elapsed_never_negative() {
        let mut job: MediaJob = serde_json::from_str(JOB_JSON).unwrap();
        job.updated_at = job.created_at - Duration::seconds(5);
        assert_eq!(job.elapsed(), Duration::zero());
    }

    #[test]
    fn test_progress_percent_is_clamped() {
        let mut job: MediaJob = serde_json::from_str(JOB_JSON).unwrap();
        job.progress = 140;
        assert_eq!(job.progress_percent(), 100);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Created.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert_eq!("DONE".parse::<JobStatus>(), Ok(JobStatus::Done));
        assert!("queued".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_input_type_from_extension() {
        assert_eq!(InputType::from_path(Path::new("a/b/song.MP3")), InputType::Audio);
        assert_eq!(InputType::from_path(Path::new("talk.m4a")), InputType::Audio);
        assert_eq!(InputType::from_path(Path::new("movie.webm")), InputType::Video);
        assert_eq!(InputType::from_path(Path::new("no_extension")), InputType::Video);
    }

    #[test]
    fn test_action_type_serializes_as_plain_string() {
        let json = serde_json::to_string(&ActionType::Blur).unwrap();
        assert_eq!(json, r#""blur""#);
        let parsed: ActionType = serde_json::from_str(r#""MUTE""#).unwrap();
        assert_eq!(parsed, ActionType::Mute);
    }

    #[test]
    fn test_variant_toggle_and_parse() {
        assert_eq!(Variant::default(), Variant::Processed);
        assert_eq!(Variant::Processed.toggled(), Variant::Original);
        assert_eq!("original".parse::<Variant>(), Ok(Variant::Original));
    }
}

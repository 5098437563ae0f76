//! Media job endpoints

use common::models::{
    HealthResponse, JobId, JobStatus, MediaJob, MediaListResponse, MessageResponse,
    RawFileResponse, StatsResponse, Variant,
};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::{info, warn};

use crate::{
    client::{Access, ApiClient},
    error::{ApiError, ApiResult},
    validation::{content_type_for, validate_subtitle, validate_upload},
};

/// A file ready to be sent as a multipart part
#[derive(Debug, Clone)]
pub struct UploadFile {
    file_name: String,
    bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a media file from disk.
    ///
    /// Type and size are checked from the file metadata first, so a
    /// rejected file is never loaded into memory.
    pub async fn read(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let file_name = Self::name_of(path)?;
        let size = tokio::fs::metadata(path).await?.len();
        validate_upload(&file_name, size).map_err(ApiError::Validation)?;

        let bytes = tokio::fs::read(path).await?;
        Ok(Self { file_name, bytes })
    }

    /// Read a `.srt`/`.vtt` sidecar from disk
    pub async fn read_subtitles(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let file_name = Self::name_of(path)?;
        validate_subtitle(&file_name).map_err(ApiError::Validation)?;

        let bytes = tokio::fs::read(path).await?;
        Ok(Self { file_name, bytes })
    }

    fn name_of(path: &Path) -> ApiResult<String> {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| ApiError::Validation(format!("Not a file: {}", path.display())))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn into_part(self) -> ApiResult<Part> {
        let mime = content_type_for(&self.file_name);
        Ok(Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(mime)?)
    }
}

/// Query parameters for media listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    /// Filter by status
    pub status: Option<JobStatus>,
    /// Number of items to skip
    pub skip: u32,
    /// Page size, 1..=100
    pub limit: u32,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            status: None,
            skip: 0,
            limit: 50,
        }
    }
}

impl ApiClient {
    /// Upload a media file for filtering.
    ///
    /// Validation happens before any network activity. The request is sent
    /// exactly once; callers decide whether to let the user retry.
    pub async fn submit(
        &self,
        file: UploadFile,
        filter_audio: bool,
        filter_video: bool,
    ) -> ApiResult<MediaJob> {
        self.submit_with_subtitles(file, filter_audio, filter_video, None)
            .await
    }

    /// Upload a media file together with an optional `.srt`/`.vtt` sidecar
    pub async fn submit_with_subtitles(
        &self,
        file: UploadFile,
        filter_audio: bool,
        filter_video: bool,
        subtitles: Option<UploadFile>,
    ) -> ApiResult<MediaJob> {
        validate_upload(file.file_name(), file.len()).map_err(ApiError::Validation)?;
        if let Some(subtitles) = &subtitles {
            validate_subtitle(subtitles.file_name()).map_err(ApiError::Validation)?;
        }
        if !filter_audio && !filter_video {
            return Err(ApiError::Validation(
                "At least one of audio or video filtering must be enabled".to_string(),
            ));
        }

        info!(
            "Submitting {} ({} bytes, filter_audio={}, filter_video={})",
            file.file_name(),
            file.len(),
            filter_audio,
            filter_video
        );

        let mut form = Form::new().part("file", file.into_part()?);
        if let Some(subtitles) = subtitles {
            form = form.part("subtitle_file", subtitles.into_part()?);
        }

        let request = self
            .http()
            .post(self.endpoint(&["process"]))
            .query(&[("filter_audio", filter_audio), ("filter_video", filter_video)])
            .multipart(form);

        let response = self
            .execute(request, Access::Session, "Upload failed")
            .await
            .inspect_err(|e| warn!("Upload failed: {}", e))?;

        let job: MediaJob = Self::decode(response).await?;
        info!("Job {} created with status {}", job.id, job.status);
        Ok(job)
    }

    /// Fetch the current state of a job
    pub async fn get_job(&self, id: JobId) -> ApiResult<MediaJob> {
        let request = self.http().get(self.endpoint(&["media", &id.to_string()]));
        let response = self
            .execute(request, Access::Session, "Failed to fetch media")
            .await?;
        Self::decode(response).await
    }

    /// List jobs, optionally filtered by status
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> ApiResult<Vec<MediaJob>> {
        let query = JobQuery {
            status,
            ..JobQuery::default()
        };
        Ok(self.list_jobs_page(&query).await?.items)
    }

    /// List one page of jobs, newest first
    pub async fn list_jobs_page(&self, query: &JobQuery) -> ApiResult<MediaListResponse> {
        if !(1..=100).contains(&query.limit) {
            return Err(ApiError::Validation(
                "limit must be between 1 and 100".to_string(),
            ));
        }

        let mut params = vec![
            ("skip", query.skip.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(status) = query.status {
            params.push(("status", status.as_str().to_string()));
        }

        let request = self.http().get(self.endpoint(&["media"])).query(&params);
        let response = self
            .execute(request, Access::Session, "Failed to list media")
            .await?;
        Self::decode(response).await
    }

    /// Delete a job and its files
    pub async fn delete_job(&self, id: JobId) -> ApiResult<MessageResponse> {
        let request = self
            .http()
            .delete(self.endpoint(&["media", &id.to_string()]));
        let response = self
            .execute(request, Access::Session, "Failed to delete media")
            .await?;

        info!("Deleted job {}", id);
        Self::decode(response).await
    }

    /// Download a job's original or processed file
    pub async fn fetch_download(&self, id: JobId, variant: Variant) -> ApiResult<Vec<u8>> {
        let request = self
            .http()
            .get(self.endpoint(&["download", &id.to_string()]))
            .query(&[("variant", variant.as_str())]);
        let response = self
            .execute(request, Access::Session, "Download failed")
            .await?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Aggregate counters
    pub async fn stats(&self) -> ApiResult<StatsResponse> {
        let request = self.http().get(self.endpoint(&["stats"]));
        let response = self
            .execute(request, Access::Session, "Failed to fetch stats")
            .await?;
        Self::decode(response).await
    }

    /// Backend liveness
    pub async fn health(&self) -> ApiResult<HealthResponse> {
        let request = self.http().get(self.endpoint(&["health"]));
        let response = self
            .execute(request, Access::Anonymous, "Health check failed")
            .await?;
        Self::decode(response).await
    }

    /// Files present in the backend output directory
    pub async fn list_output_files(&self) -> ApiResult<Vec<RawFileResponse>> {
        let request = self.http().get(self.endpoint(&["outputs", "files"]));
        let response = self
            .execute(request, Access::Session, "Failed to list raw files")
            .await?;
        Self::decode(response).await
    }

    /// Remove a file from the backend output directory
    pub async fn delete_output_file(&self, file_name: &str) -> ApiResult<MessageResponse> {
        let request = self
            .http()
            .delete(self.endpoint(&["outputs", "files", file_name]));
        let response = self
            .execute(request, Access::Session, "Failed to delete raw file")
            .await?;
        Self::decode(response).await
    }
}

use anyhow::{Context, Result, bail};
use client::{ApiClient, UploadFile};
use common::{ClientConfig, JobId, JobStatus, MediaJob, Variant};
use jobs::{
    FilterMode, FlowState, PollEvent, PollPolicy, ProcessingProjector, Stage, SubmissionFlow,
    VisualProgress,
};
use player::format_time;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, warn};

pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<()> {
    api.login(email, password).await?;
    println!("Signed in as {email}");
    Ok(())
}

pub async fn register(api: &ApiClient, email: &str, password: &str) -> Result<()> {
    let user = api.register(email, password).await?;
    println!("Registered {} (id {}). Sign in with `studio login`.", user.email, user.id);
    Ok(())
}

pub async fn whoami(api: &ApiClient) -> Result<()> {
    let user = api.current_user().await?;
    println!("{} (id {}, active: {})", user.email, user.id, user.is_active);
    Ok(())
}

pub fn logout(api: &ApiClient) {
    api.logout();
    println!("Signed out");
}

pub async fn process(
    api: &ApiClient,
    config: &ClientConfig,
    file: &Path,
    mode: FilterMode,
    subtitles: Option<&Path>,
) -> Result<()> {
    let upload = UploadFile::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let subtitles = match subtitles {
        Some(path) => Some(
            UploadFile::read_subtitles(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };

    println!("Uploading {} ({} bytes, mode {})", upload.file_name(), upload.len(), mode);

    let mut flow = SubmissionFlow::new(mode);
    let mut projector = ProcessingProjector::new();
    let mut progress = VisualProgress::default();
    let mut last_update = Instant::now();

    let state = flow
        .run(
            api,
            upload,
            subtitles,
            PollPolicy::from(&config.poll),
            |event| match event {
                PollEvent::Update(job) => {
                    let view = projector.observe(job);
                    progress.set_target(view.progress);
                    progress.tick(last_update.elapsed());
                    last_update = Instant::now();

                    if view.stage_changed {
                        println!(
                            "[{}/{}] {}",
                            view.stage.index() + 1,
                            Stage::ALL.len(),
                            view.stage
                        );
                    }
                    println!(
                        "  {:>3}%  {}  {}",
                        progress.percent(),
                        view.elapsed_label(),
                        view.activity
                    );
                    for line in &view.new_logs {
                        println!("  | {line}");
                    }
                }
                PollEvent::TickFailed { attempt, message } => {
                    warn!("Status check {} failed: {}", attempt, message);
                }
                PollEvent::Finished(_) => {}
            },
        )
        .await;

    match state {
        FlowState::Preview(job) => {
            print_result(api, job);
            Ok(())
        }
        FlowState::Upload { error } => {
            bail!(error.clone().unwrap_or_else(|| "Processing failed".to_string()))
        }
        FlowState::Processing { job_id } => bail!("Job {job_id} is still processing"),
    }
}

fn print_result(api: &ApiClient, job: &MediaJob) {
    println!("Job {} done in {}", job.id, jobs::projector::format_elapsed(job.elapsed()));

    if job.segments.is_empty() {
        println!("No content needed filtering");
    } else {
        println!("{} filtered segment(s):", job.segments.len());
        for segment in &job.segments {
            println!(
                "  {:>6}  {} - {}  {}",
                segment.action_type.as_str(),
                format_time(segment.start_ms as f64 / 1000.0),
                format_time(segment.end_ms as f64 / 1000.0),
                segment.reason.as_deref().unwrap_or("")
            );
        }
    }

    println!("Original:  {}", api.download_url(job.id, Variant::Original));
    println!("Processed: {}", api.download_url(job.id, Variant::Processed));
}

pub async fn list(api: &ApiClient, status: Option<JobStatus>) -> Result<()> {
    let jobs = api.list_jobs(status).await?;
    if jobs.is_empty() {
        println!("No jobs");
        return Ok(());
    }

    for job in jobs {
        println!(
            "{:>6}  {:<10}  {:>3}%  {:<5}  {:>3} seg  {}",
            job.id,
            job.status,
            job.progress_percent(),
            job.input_type.as_str(),
            job.segments.len(),
            job.input_path
        );
    }
    Ok(())
}

pub async fn delete(api: &ApiClient, id: JobId) -> Result<()> {
    let response = api.delete_job(id).await?;
    println!("{}", response.message);
    Ok(())
}

pub async fn download(
    api: &ApiClient,
    id: JobId,
    variant: Variant,
    out: Option<PathBuf>,
) -> Result<()> {
    let out = match out {
        Some(path) => path,
        None => default_download_path(&api.get_job(id).await?, variant),
    };

    let bytes = api.fetch_download(id, variant).await?;
    tokio::fs::write(&out, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    info!("Wrote {} bytes to {}", bytes.len(), out.display());
    println!("Saved {} ({} bytes)", out.display(), bytes.len());
    Ok(())
}

fn default_download_path(job: &MediaJob, variant: Variant) -> PathBuf {
    let input = Path::new(&job.input_path);
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("media");
    match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => PathBuf::from(format!("{stem}_{variant}.{ext}")),
        None => PathBuf::from(format!("{stem}_{variant}")),
    }
}

pub async fn stats(api: &ApiClient) -> Result<()> {
    let stats = api.stats().await?;
    println!("Jobs:     {}", stats.total_media);
    println!("Segments: {}", stats.total_segments);
    for (status, count) in &stats.by_status {
        println!("  {status:<10} {count}");
    }
    for (kind, count) in &stats.by_type {
        println!("  {kind:<10} {count}");
    }
    Ok(())
}

pub async fn outputs(api: &ApiClient) -> Result<()> {
    let files = api.list_output_files().await?;
    if files.is_empty() {
        println!("No output files");
    }
    for file in files {
        println!(
            "{}  {}  {}",
            file.modified_at.format("%Y-%m-%d %H:%M"),
            file.filename,
            api.output_file_url(&file.filename)
        );
    }
    Ok(())
}

pub async fn health(api: &ApiClient) -> Result<()> {
    let health = api.health().await?;
    println!("{}", health.status);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::InputType;

    fn job(input_path: &str) -> MediaJob {
        MediaJob {
            id: 1,
            input_path: input_path.into(),
            output_path: None,
            input_type: InputType::Video,
            filter_audio: true,
            filter_video: true,
            status: JobStatus::Done,
            progress: 100,
            current_activity: None,
            logs: Vec::new(),
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            segments: Vec::new(),
        }
    }

    #[test]
    fn test_default_download_path() {
        assert_eq!(
            default_download_path(&job("uploads/clip.mp4"), Variant::Processed),
            PathBuf::from("clip_processed.mp4")
        );
        assert_eq!(
            default_download_path(&job("noext"), Variant::Original),
            PathBuf::from("noext_original")
        );
    }
}

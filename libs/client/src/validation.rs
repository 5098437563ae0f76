//! Input validation performed before any request is sent

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Largest upload the backend accepts
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Media extensions the backend accepts
pub const ALLOWED_EXTENSIONS: [&str; 9] = [
    "mp4", "mov", "mkv", "avi", "wav", "mp3", "flac", "m4a", "webm",
];

/// Subtitle sidecar extensions the backend accepts
pub const SUBTITLE_EXTENSIONS: [&str; 2] = ["srt", "vtt"];

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Validate a media file before upload
pub fn validate_upload(file_name: &str, size: u64) -> Result<(), String> {
    if file_name.trim().is_empty() {
        return Err("File name is required".to_string());
    }

    let ext = extension(file_name).unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(format!(
            "File type not allowed: {}",
            if ext.is_empty() {
                "(none)".to_string()
            } else {
                format!(".{ext}")
            }
        ));
    }

    if size == 0 {
        return Err("File is empty".to_string());
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(format!(
            "File too large. Max: {}MB",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        ));
    }

    Ok(())
}

/// Validate a subtitle sidecar file name
pub fn validate_subtitle(file_name: &str) -> Result<(), String> {
    let ext = extension(file_name).unwrap_or_default();
    if !SUBTITLE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(format!("Invalid subtitle format: .{ext}"));
    }
    Ok(())
}

/// MIME type sent with an uploaded part
pub fn content_type_for(file_name: &str) -> &'static str {
    match extension(file_name).as_deref() {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("webm") => "video/webm",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("m4a") => "audio/x-m4a",
        Some("srt") => "application/x-subrip",
        Some("vtt") => "text/vtt",
        _ => "application/octet-stream",
    }
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    Ok(())
}

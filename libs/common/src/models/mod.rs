//! Models exchanged with the processing backend

pub mod media;
pub mod user;

// Re-export for convenience
pub use media::{
    ActionType, HealthResponse, InputType, JobId, JobStatus, MediaJob, MediaListResponse,
    MessageResponse, RawFileResponse, Segment, StatsResponse, Variant,
};
pub use user::{LoginCredentials, TokenResponse, UserResponse};

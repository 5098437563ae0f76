//! Common library for the Aegis studio client
//!
//! This crate provides the pieces shared by every other crate in the
//! workspace: the media job data model exchanged with the processing
//! backend, the session token store, client configuration and the
//! storage/configuration error types.

pub mod config;
pub mod error;
pub mod models;
pub mod session;

pub use crate::config::{ClientConfig, PollSettings};
pub use models::{
    ActionType, InputType, JobId, JobStatus, MediaJob, MediaListResponse, Segment, Variant,
};
pub use session::{InvalidationReason, Session, SessionEvent};

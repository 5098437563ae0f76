//! Typed client for the Aegis processing API
//!
//! [`ApiClient`] wraps the backend's HTTP contract: job submission, job
//! status, listing and deletion, downloads and authentication. It owns no
//! token itself; it reads and clears the [`common::Session`] it was given.

mod auth;
mod client;
mod error;
mod media;
pub mod validation;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use media::{JobQuery, UploadFile};

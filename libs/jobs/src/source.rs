use client::{ApiClient, ApiResult};
use common::{JobId, MediaJob};
use std::future::Future;

/// Anything the poll loop can fetch job state from
pub trait JobSource: Send + Sync + 'static {
    fn fetch_job(&self, id: JobId) -> impl Future<Output = ApiResult<MediaJob>> + Send;
}

impl JobSource for ApiClient {
    fn fetch_job(&self, id: JobId) -> impl Future<Output = ApiResult<MediaJob>> + Send {
        self.get_job(id)
    }
}

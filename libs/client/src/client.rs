//! HTTP client for the processing backend
//!
//! Every request goes through [`ApiClient::execute`], which attaches the
//! session's bearer token, performs the one-shot forced logout on `401` and
//! turns non-2xx responses into [`ApiError`] values.

use common::{ClientConfig, JobId, Session, Variant, session::InvalidationReason};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult, error_message};

/// How a request relates to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    /// Attach the bearer token when present; a 401 signs the session out
    Session,
    /// Never attach a token; a 401 is an ordinary failure (bad credentials)
    Anonymous,
}

/// Async API client bound to one backend and one session
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
    session: Session,
}

impl ApiClient {
    /// Create a client for the configured backend
    pub fn new(config: &ClientConfig, session: Session) -> ApiResult<Self> {
        let base_url = parse_base_url(&config.api_url)?;
        let http = Client::builder().timeout(config.request_timeout).build()?;

        debug!("API client targeting {}", base_url);

        Ok(Self {
            base_url,
            http,
            session,
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Session whose token this client sends
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Absolute URL for the given path segments; segments are percent-encoded
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL usable directly as a media element source or download link.
    ///
    /// No request is made; the token travels as a query parameter because
    /// media elements cannot send custom headers.
    pub fn download_url(&self, id: JobId, variant: Variant) -> String {
        let mut url = self.endpoint(&["download", &id.to_string()]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("variant", variant.as_str());
            if let Some(token) = self.session.read() {
                query.append_pair("token", &token);
            }
        }
        url.to_string()
    }

    /// URL of a raw file in the backend output directory
    pub fn output_file_url(&self, file_name: &str) -> String {
        let mut url = self.endpoint(&["outputs", "files", file_name]);
        if let Some(token) = self.session.read() {
            url.query_pairs_mut().append_pair("token", &token);
        }
        url.to_string()
    }

    /// Send a request and map non-2xx responses to errors
    pub(crate) async fn execute(
        &self,
        request: RequestBuilder,
        access: Access,
        fallback: &str,
    ) -> ApiResult<Response> {
        // Token actually sent, so a late 401 only signs out that token
        let sent_token = match access {
            Access::Session => self.session.read(),
            Access::Anonymous => None,
        };
        let request = match &sent_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        self.check(response, access, sent_token.as_deref(), fallback)
            .await
    }

    async fn check(
        &self,
        response: Response,
        access: Access,
        sent_token: Option<&str>,
        fallback: &str,
    ) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED && access == Access::Session {
            if let Some(token) = sent_token {
                if self.session.clear_if(token, InvalidationReason::Unauthorized) {
                    warn!("Backend rejected the session token, signing out");
                }
            }
            return Err(ApiError::Unauthorized);
        }

        let message = error_message(&body);
        debug!("Request failed with {}: {:?}", status, message);

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(
                message.unwrap_or_else(|| "Not found".to_string()),
            ));
        }

        Err(ApiError::Status {
            status,
            message: message.unwrap_or_else(|| fallback.to_string()),
        })
    }

    /// Decode a JSON body
    pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn parse_base_url(raw: &str) -> ApiResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidUrl(format!(
            "{raw}: expected an http(s) base URL"
        )));
    }

    Ok(url)
}

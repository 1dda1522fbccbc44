//! Batch submission against the Slides REST API.
//!
//! [`SlidesService`] is the seam between the builders and the network. The
//! production implementation, [`HttpSlidesService`], issues exactly one
//! blocking HTTP request per call. Tests substitute a recording mock.

use super::requests::{Batch, BatchReply};
use crate::auth::{AuthError, SessionHandle};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Root of the Slides REST API.
pub const SLIDES_API_BASE: &str = "https://slides.googleapis.com/v1/presentations";

/// Why a remote call did not produce a usable reply.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },
}

#[derive(Error, Debug)]
pub enum SlidesError {
    #[error("batch submission failed: {0}")]
    RemoteSubmission(#[source] RemoteError),
    #[error("reading presentation failed: {0}")]
    RemoteRead(#[source] RemoteError),
    #[error("malformed reply: {0}")]
    MalformedReply(String),
    #[error("parallel inputs disagree: {field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl SlidesError {
    /// Whether resubmitting the same batch may succeed.
    ///
    /// Transport and service failures of a submission are treated as
    /// transient. Credential failures, malformed replies and invalid inputs
    /// are not: retrying cannot change them.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RemoteSubmission(RemoteError::Auth(_)) => false,
            Self::RemoteSubmission(_) => true,
            _ => false,
        }
    }
}

/// What must be known about a presentation before inserting a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationState {
    pub presentation_id: String,
    pub slide_count: usize,
}

/// A presentation that accepts batches.
pub trait SlidesService {
    /// Read the current slide count.
    fn fetch_state(&self) -> Result<PresentationState, SlidesError>;

    /// Submit one batch as one atomic request.
    fn submit(&self, batch: &Batch) -> Result<BatchReply, SlidesError>;
}

/// Read the object ID produced by the Create* operation at `index`.
pub fn extract_created_id(reply: &BatchReply, index: usize) -> Result<String, SlidesError> {
    let result = reply.replies.get(index).ok_or_else(|| {
        SlidesError::MalformedReply(format!(
            "expected a result at index {index}, reply has {}",
            reply.replies.len()
        ))
    })?;
    result
        .created_id()
        .map(str::to_string)
        .ok_or_else(|| SlidesError::MalformedReply(format!("result {index} carries no created object")))
}

#[derive(Deserialize)]
struct PresentationDocument {
    #[serde(default)]
    slides: Vec<serde_json::Value>,
}

/// [`SlidesService`] over HTTPS, bound to one presentation.
pub struct HttpSlidesService<'a> {
    session: &'a SessionHandle,
    presentation_id: String,
}

impl<'a> HttpSlidesService<'a> {
    pub fn new(session: &'a SessionHandle, presentation_id: impl Into<String>) -> Self {
        Self {
            session,
            presentation_id: presentation_id.into(),
        }
    }

    fn authorized(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, RemoteError> {
        let token = self.session.access_token()?;
        let response = request.bearer_auth(token).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::Service {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl SlidesService for HttpSlidesService<'_> {
    fn fetch_state(&self) -> Result<PresentationState, SlidesError> {
        let url = format!("{SLIDES_API_BASE}/{}", self.presentation_id);
        let response = self
            .authorized(self.session.http().get(url))
            .map_err(SlidesError::RemoteRead)?;
        let document: PresentationDocument = response
            .json()
            .map_err(|e| SlidesError::MalformedReply(format!("undecodable presentation: {e}")))?;
        debug!(slides = document.slides.len(), "fetched presentation");
        Ok(PresentationState {
            presentation_id: self.presentation_id.clone(),
            slide_count: document.slides.len(),
        })
    }

    fn submit(&self, batch: &Batch) -> Result<BatchReply, SlidesError> {
        let url = format!("{SLIDES_API_BASE}/{}:batchUpdate", self.presentation_id);
        debug!(operations = batch.len(), "submitting batch");
        let response = self
            .authorized(self.session.http().post(url).json(batch))
            .map_err(SlidesError::RemoteSubmission)?;
        let reply: BatchReply = response
            .json()
            .map_err(|e| SlidesError::MalformedReply(format!("undecodable batch reply: {e}")))?;
        if reply.replies.len() != batch.len() {
            return Err(SlidesError::MalformedReply(format!(
                "{} replies for {} operations",
                reply.replies.len(),
                batch.len()
            )));
        }
        Ok(reply)
    }
}

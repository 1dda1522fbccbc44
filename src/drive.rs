//! Publishing local images through Google Drive.
//!
//! The Slides service only embeds images it can fetch by URL. A local file
//! is uploaded to Drive, shared with "anyone with the link", and referenced
//! by its public download URL.
//!
//! The upload is a single `multipart/related` request carrying the file
//! metadata (its name) and the bytes, followed by one permission request.

use crate::auth::{AuthError, SessionHandle};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("drive returned HTTP {status}: {body}")]
    Service { status: u16, body: String },
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
}

/// URL from which anyone can fetch the file with ID `file_id`.
pub fn public_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?id={file_id}")
}

/// MIME type for an image path, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("tif" | "tiff") => "image/tiff",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Body of a `multipart/related` upload: a JSON metadata part followed by
/// the media part.
pub fn multipart_body(
    boundary: &str,
    metadata: &serde_json::Value,
    content_type: &str,
    media: &[u8],
) -> Vec<u8> {
    let mut body = format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
         --{boundary}\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Uploads images with a drive-scoped session.
pub struct DrivePublisher<'a> {
    session: &'a SessionHandle,
}

impl<'a> DrivePublisher<'a> {
    pub fn new(session: &'a SessionHandle) -> Self {
        Self { session }
    }

    fn send(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, DriveError> {
        let token = self.session.access_token()?;
        let response = request.bearer_auth(token).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DriveError::Service {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Upload `path`, make it world-readable, and return its public URL.
    pub fn publish_image(&self, path: &Path) -> Result<String, DriveError> {
        let bytes = std::fs::read(path)?;
        let http = self.session.http();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let boundary = format!("tomolog-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_body(
            &boundary,
            &json!({ "name": name }),
            content_type_for(path),
            &bytes,
        );

        let file: DriveFile = self
            .send(
                http.post(UPLOAD_URL)
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        format!("multipart/related; boundary={boundary}"),
                    )
                    .body(body),
            )?
            .json()?;

        self.send(
            http.post(format!("{FILES_URL}/{}/permissions", file.id))
                .json(&json!({ "role": "reader", "type": "anyone" })),
        )?;

        let url = public_url(&file.id);
        info!(path = %path.display(), %url, "published image to drive");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_uses_download_endpoint() {
        assert_eq!(public_url("f1"), "https://drive.google.com/uc?id=f1");
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type_for(Path::new("rec_0512.png")), "image/png");
        assert_eq!(content_type_for(Path::new("a/b/proj.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("slice.tiff")), "image/tiff");
        assert_eq!(
            content_type_for(Path::new("data.h5")),
            "application/octet-stream"
        );
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn multipart_body_has_metadata_then_media() {
        let body = multipart_body("b0", &json!({"name": "rec.png"}), "image/png", b"\x89PNG");
        let expected = [
            &b"--b0\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n"[..],
            &br#"{"name":"rec.png"}"#[..],
            &b"\r\n--b0\r\nContent-Type: image/png\r\n\r\n"[..],
            &b"\x89PNG"[..],
            &b"\r\n--b0--\r\n"[..],
        ]
        .concat();
        assert_eq!(body, expected);
    }
}

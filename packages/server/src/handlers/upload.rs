//! Multipart helpers shared by video and profile image uploads.

use axum::extract::DefaultBodyLimit;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use mime_guess::mime::Mime;

use crate::error::AppError;

/// Room for multipart framing and text fields on top of the file limits.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

pub fn upload_body_limit(max_file_size: u64, files: u64) -> DefaultBodyLimit {
    let limit = max_file_size
        .saturating_mul(files)
        .saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

/// Body-limit overruns surface as multipart errors; keep their 413.
pub fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Multipart error: {}", e.body_text()))
    }
}

/// A file read from a multipart field.
pub struct FilePart {
    pub data: Bytes,
    pub filename: String,
    pub content_type: String,
}

/// `type/subtype` of a declared content type, without parameters such as
/// `codecs=` or `charset=`.
fn essence(content_type: &str) -> String {
    match content_type.parse::<Mime>() {
        Ok(mime) => mime.essence_str().to_ascii_lowercase(),
        Err(_) => content_type.trim().to_ascii_lowercase(),
    }
}

/// Buffer a file field, enforcing the size limit and MIME allow-list.
///
/// The declared part content type is used when present, otherwise it is
/// guessed from the filename.
pub async fn read_file_field(
    mut field: Field<'_>,
    max_size: u64,
    allowed: &[&str],
) -> Result<FilePart, AppError> {
    let filename = field
        .file_name()
        .map(str::to_string)
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;

    let content_type = field
        .content_type()
        .map(essence)
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| {
            mime_guess::from_path(&filename)
                .first()
                .map(|m| m.essence_str().to_ascii_lowercase())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if !allowed.contains(&content_type.as_str()) {
        return Err(AppError::UnsupportedMediaType(format!(
            "Unsupported file type '{content_type}'. Allowed: {}",
            allowed.join(", ")
        )));
    }

    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if (buf.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds maximum size of {max_size} bytes"
            )));
        }
        buf.extend_from_slice(&chunk);
    }

    if buf.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    Ok(FilePart {
        data: buf.freeze(),
        filename,
        content_type,
    })
}

pub async fn read_text_field(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use otogram_common::storage::ObjectKey;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::media::MediaFolder;
use crate::state::AppState;

const CACHE_CONTROL: &str = "public, max-age=86400";

#[utoipa::path(
    get,
    path = "/{folder}/{file_id}",
    tag = "Files",
    operation_id = "getFile",
    summary = "Serve a stored media file",
    description = "Streams an uploaded video, thumbnail, or profile image. \
        `folder` is one of `videos`, `thumbnails`, `profiles` (alias `images`).",
    params(
        ("folder" = String, Path, description = "Storage folder"),
        ("file_id" = String, Path, description = "File name inside the folder"),
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed file name (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown folder or missing file (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_file(
    State(state): State<AppState>,
    Path((folder, file_id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let folder = MediaFolder::from_route_segment(&folder)
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;
    let key = ObjectKey::join(folder.as_str(), &file_id)?;

    let object = state.media.fetch(&key).await?;
    let content_type = object
        .content_type
        .unwrap_or_else(|| mime_guess::from_path(&file_id).first_or_octet_stream().to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
        ],
        object.data,
    )
        .into_response())
}

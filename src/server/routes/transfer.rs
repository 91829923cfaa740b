//! Upload, download and archive retrieval routes

use anyhow::Context;
use bytes::Buf;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use warp::Filter;
use warp::http::StatusCode;

use super::{JSON_BODY_LIMIT, with_state};
use crate::models::responses::{ArchiveQuery, DownloadRequest, TransferResult};
use crate::models::transfer::UploadFile;
use crate::server::app::SharedState;

/// Attachment name for every served archive
pub const ARCHIVE_DOWNLOAD_NAME: &str = "downloaded_files.zip";

/// Create all transfer-related routes
pub fn create_transfer_routes(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    upload_route(state.clone())
        .or(download_route(state.clone()))
        .or(archive_route(state))
}

/// POST /api/upload - multipart `files` parts plus a `connection` field
fn upload_route(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let max_length = state.config.max_upload_bytes();

    warp::path("api")
        .and(warp::path("upload"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_length))
        .and(with_state(state))
        .and_then(upload_handler)
}

/// POST /api/download - `{connection, files}`
fn download_route(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("api")
        .and(warp::path("download"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json())
        .and(with_state(state))
        .and_then(download_handler)
}

/// GET /download?id=... (or ?path=...) - serve a generated archive
fn archive_route(
    state: SharedState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("download")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<ArchiveQuery>())
        .and(with_state(state))
        .and_then(archive_handler)
}

/// Parts of an upload form
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<UploadFile>,
    connection: Option<String>,
}

async fn upload_handler(
    form: warp::multipart::FormData,
    state: SharedState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let request_start = std::time::Instant::now();

    let form = match parse_upload_form(form).await {
        Ok(form) => form,
        Err(e) => {
            warn!("❌ Failed to parse multipart form: {:#}", e);
            return Ok(warp::reply::json(&TransferResult::failure(format!(
                "Failed to parse multipart form: {:#}",
                e
            ))));
        }
    };

    info!(
        "📋 Parsed upload form in {:.2}ms: {} files, {:.1} KB",
        request_start.elapsed().as_secs_f64() * 1000.0,
        form.files.len(),
        form.files.iter().map(|f| f.content.len()).sum::<usize>() as f64 / 1024.0
    );

    if form.files.is_empty() {
        return Ok(warp::reply::json(&TransferResult::failure(
            "No files selected",
        )));
    }

    let Some(connection) = form.connection else {
        return Ok(warp::reply::json(&TransferResult::failure(
            "Missing connection field",
        )));
    };

    let profile = match serde_json::from_str::<serde_json::Value>(&connection)
        .context("Invalid connection JSON")
        .and_then(|value| state.registry.resolve_connection(&value))
    {
        Ok(profile) => profile,
        Err(e) => {
            return Ok(warp::reply::json(&TransferResult::failure(format!(
                "{:#}",
                e
            ))));
        }
    };

    let result = state.coordinator.upload(profile, form.files).await;
    Ok(warp::reply::json(&result))
}

/// Collect `files` parts and the `connection` field; other parts are ignored
async fn parse_upload_form(mut form: warp::multipart::FormData) -> anyhow::Result<UploadForm> {
    let mut upload = UploadForm::default();

    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| anyhow::anyhow!("Error reading multipart: {}", e))?
    {
        let name = part.name().to_string();
        let filename = part.filename().map(str::to_string);
        debug!("🔧 Processing multipart field: '{}'", name);

        let data = part
            .stream()
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(chunk.chunk());
                Ok(acc)
            })
            .await
            .map_err(|e| anyhow::anyhow!("Error reading field '{}': {}", name, e))?;

        match name.as_str() {
            "files" => match filename.filter(|f| !f.is_empty()) {
                Some(filename) => upload.files.push(UploadFile::new(filename, data)),
                None => debug!("Skipping file part without a filename"),
            },
            "connection" => {
                upload.connection = Some(
                    String::from_utf8(data).context("Connection field is not valid UTF-8")?,
                );
            }
            other => debug!("Ignoring unknown multipart field '{}'", other),
        }
    }

    Ok(upload)
}

async fn download_handler(
    request: DownloadRequest,
    state: SharedState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = match state.registry.resolve_connection(&request.connection) {
        Ok(profile) => state.coordinator.download(profile, request.files).await,
        Err(e) => TransferResult::failure(format!("{:#}", e)),
    };
    Ok(warp::reply::json(&result))
}

async fn archive_handler(
    query: ArchiveQuery,
    state: SharedState,
) -> Result<warp::reply::Response, warp::Rejection> {
    use warp::Reply;

    let archives = state.coordinator.archives();
    let resolved = match (&query.id, &query.path) {
        (Some(id), _) => archives.resolve_id(id),
        (None, Some(path)) => archives.resolve_path(path),
        (None, None) => None,
    };

    let Some(path) = resolved else {
        return Ok(not_found());
    };

    match tokio::fs::read(&path).await {
        Ok(data) => {
            info!("📦 Serving {} ({} bytes)", path.display(), data.len());
            Ok(warp::http::Response::builder()
                .header("content-type", "application/zip")
                .header(
                    "content-disposition",
                    format!("attachment; filename=\"{}\"", ARCHIVE_DOWNLOAD_NAME),
                )
                .body(data)
                .map(|response| response.into_response())
                .unwrap_or_else(|_| {
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }))
        }
        Err(e) => {
            warn!("Archive {} is registered but unreadable: {}", path.display(), e);
            Ok(not_found())
        }
    }
}

fn not_found() -> warp::reply::Response {
    use warp::Reply;
    warp::reply::with_status("File not found".to_string(), StatusCode::NOT_FOUND).into_response()
}

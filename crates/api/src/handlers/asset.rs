//! Handlers for the `/assets` resource.
//!
//! `stream` is the retrieval proxy: it forwards Range requests to the
//! object store through [`AssetFetcher`](shotforge_cloud::AssetFetcher),
//! which hides upload lag behind retries, and re-emits the upstream
//! response as a streaming body.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{self, HeaderMap};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use shotforge_core::error::CoreError;
use shotforge_core::types::DbId;
use shotforge_db::models::media_asset::MediaAsset;
use shotforge_db::repositories::MediaAssetRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListAssetsParams {
    pub project_id: Option<DbId>,
}

/// GET /api/v1/assets?project_id={project_id}
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListAssetsParams>,
) -> AppResult<Json<DataResponse<Vec<MediaAsset>>>> {
    let project_id = params
        .project_id
        .ok_or_else(|| AppError::BadRequest("project_id query parameter is required".into()))?;
    let assets = MediaAssetRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// GET /api/v1/assets/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MediaAsset>>> {
    let asset = MediaAssetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MediaAsset",
            id,
        }))?;
    Ok(Json(DataResponse { data: asset }))
}

/// GET /api/v1/assets/{id}/stream
///
/// Streams the asset's bytes from the object store with HTTP range
/// request support. When the fetcher finds the object under an
/// alternate key, the corrected key is written back to the record.
pub async fn stream(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let asset = MediaAssetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MediaAsset",
            id,
        }))?;

    // Check for a Range header. Unparseable ranges are ignored rather
    // than rejected; the full object is served instead.
    let range = match headers.get(header::RANGE) {
        Some(value) => {
            let range_str = value
                .to_str()
                .map_err(|_| AppError::BadRequest("Invalid Range header".into()))?;
            parse_range_header(range_str)
        }
        None => None,
    };

    let fetched = state
        .fetcher
        .fetch(&asset.storage_key, &asset.filename, range)
        .await?;

    if let Some(corrected) = &fetched.corrected_key {
        tracing::info!(
            asset_id = asset.id,
            old_key = %asset.storage_key,
            new_key = %corrected,
            "Asset found under alternate key, updating record"
        );
        if let Err(e) = MediaAssetRepo::update_storage_key(&state.pool, asset.id, corrected).await
        {
            tracing::error!(asset_id = asset.id, error = %e, "Failed to persist corrected storage key");
        }
    }

    proxy_response(fetched.response)
}

/// Parse a `Range: bytes=START-END` header value.
/// Returns `(start, optional_end)`.
fn parse_range_header(range: &str) -> Option<(u64, Option<u64>)> {
    let range = range.strip_prefix("bytes=")?;
    let parts: Vec<&str> = range.splitn(2, '-').collect();
    if parts.len() != 2 {
        return None;
    }
    let start = parts[0].parse::<u64>().ok()?;
    let end = if parts[1].is_empty() {
        None
    } else {
        Some(parts[1].parse::<u64>().ok()?)
    };
    Some((start, end))
}

/// Re-emit an upstream object response, preserving the headers a media
/// player cares about and streaming the body through without buffering.
fn proxy_response(upstream: reqwest::Response) -> AppResult<Response> {
    let mut builder = Response::builder().status(upstream.status().as_u16());

    for name in [
        header::CONTENT_TYPE,
        header::CONTENT_LENGTH,
        header::CONTENT_RANGE,
    ] {
        if let Some(value) = upstream.headers().get(&name) {
            builder = builder.header(&name, value);
        }
    }

    builder
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_ended_range() {
        assert_eq!(parse_range_header("bytes=100-"), Some((100, None)));
    }

    #[test]
    fn parses_bounded_range() {
        assert_eq!(parse_range_header("bytes=0-1023"), Some((0, Some(1023))));
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_eq!(parse_range_header("100-200"), None);
    }

    #[test]
    fn rejects_suffix_and_garbage_ranges() {
        // Suffix ranges (bytes=-500) are not supported; the caller
        // falls back to a full fetch.
        assert_eq!(parse_range_header("bytes=-500"), None);
        assert_eq!(parse_range_header("bytes=abc-def"), None);
    }
}

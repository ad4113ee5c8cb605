// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /embed HTTP handler

use crate::api::embed::{EmbedRequest, EmbedResponse};
use crate::api::http_server::AppState;
use crate::api::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::time::Instant;
use tracing::{debug, error, warn};

/// POST /embed handler
///
/// Tokenizes, encodes, pools and normalizes `texts` with the process-wide
/// model handle. The forward pass is compute bound, so it runs on the
/// blocking thread pool.
///
/// # Errors
/// - 400 when the body is not `{"texts": [string, ...]}`
/// - 500 when tokenization or inference fails (no retry, no partial results)
pub async fn embed_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected embed request: {}", rejection.body_text());
        ApiError::InvalidRequest(rejection.body_text())
    })?;

    if request.texts.is_empty() {
        return Ok(Json(EmbedResponse::empty()));
    }

    let text_count = request.texts.len();
    let handle = state.model.clone();
    let started = Instant::now();

    let vectors = tokio::task::spawn_blocking(move || handle.embed(&request.texts))
        .await
        .map_err(|e| {
            error!("Embedding task did not complete: {}", e);
            ApiError::InternalError(format!("embedding task failed: {}", e))
        })?
        .map_err(|e| {
            error!("Embedding failed for {} texts: {}", text_count, e);
            ApiError::from(e)
        })?;

    let response = EmbedResponse { vectors };
    debug!(
        "Embedded {} texts ({} dims) in {}ms",
        text_count,
        response.dimension().unwrap_or(0),
        started.elapsed().as_millis()
    );

    Ok(Json(response))
}

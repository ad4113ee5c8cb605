// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::api::http_server::AppState;
use axum::{extract::State, http::Uri, Json};
use serde::{Deserialize, Serialize};

use super::ApiError;

/// Body of GET /health. Liveness only: the handle exists once the process serves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub ok: bool,
    pub model: String,
    pub device: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        model: state.model.model_id().to_string(),
        device: state.model.device().to_string(),
    })
}

pub async fn not_found_handler(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared helpers: a deterministic fake encoder and a fixture tokenizer, so
//! the pipeline and HTTP layer can be tested without model downloads.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use embed_node::embeddings::{
    BatchTokenizer, EmbedError, Encoder, ModelHandle, PoolingStrategy, RuntimeProfile,
    TokenizedBatch,
};
use embed_node::{create_app, AppState};
use ndarray::Array3;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

pub const FIXTURE_TOKENIZER: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tokenizer.json");
pub const TEST_MODEL_ID: &str = "test-org/fixture-encoder";
pub const HIDDEN_SIZE: usize = 8;

/// Hidden states are a fixed function of (token id, position, dimension) plus
/// a small term from the row's real tokens, so the first token still depends
/// on the whole input. Padding never affects real positions.
pub struct FakeEncoder {
    hidden_size: usize,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeEncoder {
    pub fn new(hidden_size: usize) -> Self {
        Self {
            hidden_size,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(HIDDEN_SIZE)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Encoder for FakeEncoder {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn forward(&self, batch: &TokenizedBatch) -> Result<Array3<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EmbedError::Inference("simulated device failure".to_string()));
        }

        let context: Vec<f32> = batch
            .input_ids
            .rows()
            .into_iter()
            .zip(batch.attention_mask.rows())
            .map(|(ids, mask)| {
                ids.iter()
                    .zip(mask.iter())
                    .map(|(&id, &m)| (id * m) as f32)
                    .sum()
            })
            .collect();

        Ok(Array3::from_shape_fn(
            (batch.batch_size(), batch.seq_len(), self.hidden_size),
            |(i, j, k)| {
                let id = batch.input_ids[[i, j]] as f32;
                ((id + 1.0) * (k as f32 + 1.0) + 0.1 * j as f32).sin() + 0.05 * context[i]
            },
        ))
    }
}

pub fn fixture_tokenizer(max_length: usize) -> BatchTokenizer {
    BatchTokenizer::from_file(FIXTURE_TOKENIZER, max_length).expect("fixture tokenizer loads")
}

/// Handle over the fixture tokenizer and `encoder`
pub fn test_handle(encoder: Arc<FakeEncoder>, pooling: PoolingStrategy) -> Arc<ModelHandle> {
    Arc::new(ModelHandle::new(
        TEST_MODEL_ID,
        fixture_tokenizer(16),
        encoder,
        RuntimeProfile::cpu(),
        pooling,
    ))
}

pub fn test_app(encoder: Arc<FakeEncoder>, pooling: PoolingStrategy) -> Router {
    create_app(AppState::new(test_handle(encoder, pooling)))
}

pub fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router responds");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_raw(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Parses `{"vectors": [[...], ...]}` into nested f32 vectors
pub fn vectors_of(body: &Value) -> Vec<Vec<f32>> {
    body["vectors"]
        .as_array()
        .expect("vectors array")
        .iter()
        .map(|v| {
            v.as_array()
                .expect("vector array")
                .iter()
                .map(|x| x.as_f64().expect("finite number") as f32)
                .collect()
        })
        .collect()
}

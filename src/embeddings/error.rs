// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Errors raised while computing embeddings for a request.
//!
//! Startup failures (missing artifacts, bad model identifier) are reported
//! through `anyhow` with context instead; by the time a request reaches the
//! pipeline the model is known to be loaded.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    /// The tokenizer rejected the input batch
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    /// The encoder forward pass failed inside ONNX Runtime
    #[error("inference failed: {0}")]
    Inference(String),

    /// Hidden states did not line up with the tokenized batch
    #[error("unexpected hidden state shape {actual:?} (expected [{batch}, {seq_len}, _])")]
    Shape {
        actual: Vec<usize>,
        batch: usize,
        seq_len: usize,
    },
}

impl From<ort::Error> for EmbedError {
    fn from(err: ort::Error) -> Self {
        EmbedError::Inference(err.to_string())
    }
}

impl From<ndarray::ShapeError> for EmbedError {
    fn from(err: ndarray::ShapeError) -> Self {
        EmbedError::Inference(format!("tensor shape error: {}", err))
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedResponse type for POST /embed

use serde::{Deserialize, Serialize};

/// Response body for POST /embed
///
/// One vector per input text, in input order. Every vector has the encoder's
/// hidden dimension and unit Euclidean norm. A NaN component (zero-norm input)
/// serializes as `null`.
///
/// # Example
/// ```json
/// {
///   "vectors": [[0.013, -0.042, ...], [0.027, 0.008, ...]]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub vectors: Vec<Vec<f32>>,
}

impl EmbedResponse {
    pub fn empty() -> Self {
        Self {
            vectors: Vec::new(),
        }
    }

    /// Length shared by every vector, or `None` for an empty response
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.first().map(Vec::len)
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use crate::embeddings::{EmbedError, TokenizedBatch};
use ndarray::Array3;

/// Token batch in, per-token hidden states out.
///
/// Implementations must be inference-only and deterministic: the same batch
/// always yields the same hidden states.
#[cfg_attr(test, mockall::automock)]
pub trait Encoder: Send + Sync {
    /// Width of each per-token hidden state
    fn hidden_size(&self) -> usize;

    /// Runs the forward pass, returning `[batch, seq_len, hidden_size]`
    fn forward(&self, batch: &TokenizedBatch) -> Result<Array3<f32>, EmbedError>;
}

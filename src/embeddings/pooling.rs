// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Pooling and normalization of encoder hidden states.
//!
//! Hidden states arrive as `[batch, seq_len, hidden_dim]` and leave as one
//! `[hidden_dim]` row per input.

use ndarray::{s, Array2, ArrayView2, ArrayView3, Axis};
use std::fmt;
use tracing::warn;

/// Floor for the unmasked-token count in mean pooling
pub const MASK_EPSILON: f32 = 1e-9;

/// How per-token hidden states are reduced to one vector per input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolingStrategy {
    /// Average over real (non-padding) tokens
    #[default]
    Mean,
    /// Hidden state of the first token
    Cls,
}

impl PoolingStrategy {
    /// Resolves the `POOLING` setting.
    ///
    /// `cls` (any case) selects CLS pooling. Every other value selects mean
    /// pooling; values other than `mean` are logged so a typo is visible in
    /// the startup output.
    pub fn from_setting(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cls" => PoolingStrategy::Cls,
            "mean" => PoolingStrategy::Mean,
            other => {
                warn!(
                    "Unrecognized pooling strategy '{}', falling back to mean pooling",
                    other
                );
                PoolingStrategy::Mean
            }
        }
    }

    pub fn pool(&self, hidden: ArrayView3<f32>, attention_mask: ArrayView2<i64>) -> Array2<f32> {
        match self {
            PoolingStrategy::Mean => mean_pool(hidden, attention_mask),
            PoolingStrategy::Cls => cls_pool(hidden),
        }
    }
}

impl fmt::Display for PoolingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolingStrategy::Mean => f.write_str("mean"),
            PoolingStrategy::Cls => f.write_str("cls"),
        }
    }
}

/// Masked mean over the sequence axis.
///
/// `attention_mask` must be `[batch, seq_len]` matching `hidden`.
pub fn mean_pool(hidden: ArrayView3<f32>, attention_mask: ArrayView2<i64>) -> Array2<f32> {
    let (batch, seq_len, hidden_dim) = hidden.dim();
    let mut pooled = Array2::<f32>::zeros((batch, hidden_dim));

    for (b, mut row) in pooled.axis_iter_mut(Axis(0)).enumerate() {
        let mut sum_mask = 0.0f32;
        for t in 0..seq_len {
            let mask_value = attention_mask[[b, t]] as f32;
            sum_mask += mask_value;
            row.scaled_add(mask_value, &hidden.slice(s![b, t, ..]));
        }

        let count = sum_mask.max(MASK_EPSILON);
        row.mapv_inplace(|v| v / count);
    }

    pooled
}

/// First-token hidden state for every input; the mask is not consulted.
pub fn cls_pool(hidden: ArrayView3<f32>) -> Array2<f32> {
    let (batch, seq_len, hidden_dim) = hidden.dim();
    if seq_len == 0 {
        return Array2::zeros((batch, hidden_dim));
    }
    hidden.index_axis(Axis(1), 0).to_owned()
}

/// Divides every row by its Euclidean norm.
///
/// A zero row is divided by zero and comes back as NaN.
pub fn l2_normalize(mut vectors: Array2<f32>) -> Array2<f32> {
    for mut row in vectors.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        row.mapv_inplace(|v| v / norm);
    }
    vectors
}

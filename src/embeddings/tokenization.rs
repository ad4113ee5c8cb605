// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Batch tokenization with padding to the longest input and truncation to
//! the encoder's maximum sequence length.

use crate::embeddings::EmbedError;
use anyhow::{anyhow, Result};
use ndarray::Array2;
use std::path::Path;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Pad tokens tried in order when the tokenizer carries no padding config
const PAD_TOKEN_CANDIDATES: [&str; 2] = ["<pad>", "[PAD]"];

/// Token ids, attention mask and segment ids for one request, `[batch, seq_len]` each.
///
/// `attention_mask[[i, j]] == 1` exactly when `input_ids[[i, j]]` is a real token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedBatch {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
    pub token_type_ids: Array2<i64>,
}

impl TokenizedBatch {
    pub fn batch_size(&self) -> usize {
        self.input_ids.nrows()
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }
}

/// Tokenizer configured for batch encoding
#[derive(Clone)]
pub struct BatchTokenizer {
    tokenizer: Tokenizer,
    pad_id: u32,
    max_length: usize,
}

impl std::fmt::Debug for BatchTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchTokenizer")
            .field("pad_id", &self.pad_id)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl BatchTokenizer {
    /// Loads `tokenizer.json` from disk
    pub fn from_file<P: AsRef<Path>>(path: P, max_length: usize) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            anyhow!("Failed to load tokenizer from {}: {}", path.display(), e)
        })?;
        Self::new(tokenizer, max_length)
    }

    /// Wraps a tokenizer, forcing batch-longest padding and truncation to `max_length`
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        if max_length == 0 {
            anyhow::bail!("Maximum sequence length must be greater than 0");
        }

        let padding = match tokenizer.get_padding() {
            Some(existing) => PaddingParams {
                strategy: PaddingStrategy::BatchLongest,
                ..existing.clone()
            },
            None => {
                let (pad_id, pad_token) = PAD_TOKEN_CANDIDATES
                    .iter()
                    .find_map(|token| {
                        tokenizer
                            .token_to_id(token)
                            .map(|id| (id, token.to_string()))
                    })
                    .unwrap_or((0, "[PAD]".to_string()));
                PaddingParams {
                    strategy: PaddingStrategy::BatchLongest,
                    pad_id,
                    pad_token,
                    ..Default::default()
                }
            }
        };
        let pad_id = padding.pad_id;

        tokenizer.with_padding(Some(padding));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;

        Ok(Self {
            tokenizer,
            pad_id,
            max_length,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    /// Encodes all texts as one padded batch. Overlong texts are cut, not rejected.
    pub fn encode_batch(&self, texts: &[String]) -> Result<TokenizedBatch, EmbedError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbedError::Tokenization(e.to_string()))?;

        // Padding already equalizes lengths; pad again in case a post-processor disagreed
        let seq_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);

        let batch = encodings.len();
        let mut input_ids = Vec::with_capacity(batch * seq_len);
        let mut attention_mask = Vec::with_capacity(batch * seq_len);
        let mut token_type_ids = Vec::with_capacity(batch * seq_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            input_ids.extend(ids.iter().map(|&id| id as i64));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
            token_type_ids.extend(encoding.get_type_ids().iter().map(|&t| t as i64));

            let padding_needed = seq_len - ids.len();
            input_ids.extend(std::iter::repeat(self.pad_id as i64).take(padding_needed));
            attention_mask.extend(std::iter::repeat(0i64).take(padding_needed));
            token_type_ids.extend(std::iter::repeat(0i64).take(padding_needed));
        }

        Ok(TokenizedBatch {
            input_ids: Array2::from_shape_vec((batch, seq_len), input_ids)?,
            attention_mask: Array2::from_shape_vec((batch, seq_len), attention_mask)?,
            token_type_ids: Array2::from_shape_vec((batch, seq_len), token_type_ids)?,
        })
    }
}

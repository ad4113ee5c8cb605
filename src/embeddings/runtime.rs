// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model runtime handle
//!
//! Built once at startup, then shared read-only (behind `Arc`) by every
//! request. Holds the tokenizer, the encoder, the device/precision profile
//! and the pooling strategy.

use crate::embeddings::artifacts::{self, ModelSource, OnnxFiles};
use crate::embeddings::device::{
    self, CudaOutcome, Device, DevicePreference, Precision, RuntimeProfile,
};
use crate::embeddings::pooling::{l2_normalize, PoolingStrategy};
use crate::embeddings::{BatchTokenizer, EmbedError, Encoder, OnnxEncoder};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Probe text for validating the encoder at load time
const PROBE_TEXT: &str = "validation test";

/// Profile actually run once the export's precision is known
fn effective_profile(requested: RuntimeProfile, resolved: Precision) -> RuntimeProfile {
    match resolved {
        Precision::F32 => requested.with_full_precision(),
        Precision::F16 => requested,
    }
}

/// Settings that decide which model is loaded and how it is run
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Hub repository id or local directory
    pub model_id: String,
    pub pooling: PoolingStrategy,
    pub device: DevicePreference,
    pub onnx_files: OnnxFiles,
    /// Overrides the length derived from the model configs
    pub max_seq_length: Option<usize>,
    pub intra_threads: usize,
    pub hf_token: Option<String>,
}

pub struct ModelHandle {
    model_id: String,
    tokenizer: BatchTokenizer,
    encoder: Arc<dyn Encoder>,
    profile: RuntimeProfile,
    pooling: PoolingStrategy,
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model_id", &self.model_id)
            .field("tokenizer", &self.tokenizer)
            .field("hidden_size", &self.encoder.hidden_size())
            .field("profile", &self.profile)
            .field("pooling", &self.pooling)
            .finish()
    }
}

impl ModelHandle {
    pub fn new(
        model_id: impl Into<String>,
        tokenizer: BatchTokenizer,
        encoder: Arc<dyn Encoder>,
        profile: RuntimeProfile,
        pooling: PoolingStrategy,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            tokenizer,
            encoder,
            profile,
            pooling,
        }
    }

    /// Selects the device, resolves artifacts and loads tokenizer and encoder.
    ///
    /// Blocking: may download model files. Under `DEVICE=auto` a CUDA load
    /// that fails is retried on the CPU with the full-precision export. Any
    /// other error here means the service has no model and must not start.
    pub fn load(settings: &ModelSettings) -> Result<Self> {
        let requested = device::detect_runtime(settings.device)?;

        let handle = match requested.device {
            Device::Cuda => {
                let attempt = Self::load_with_profile(settings, requested);
                match device::after_cuda_attempt(settings.device, attempt)? {
                    CudaOutcome::Ready(handle) => handle,
                    CudaOutcome::FallBackToCpu => {
                        Self::load_with_profile(settings, RuntimeProfile::cpu())?
                    }
                }
            }
            Device::Cpu => Self::load_with_profile(settings, requested)?,
        };

        info!(
            "Model {} loaded: device={} precision={} pooling={} max_length={} hidden_size={}",
            handle.model_id,
            handle.profile.device,
            handle.profile.precision,
            handle.pooling,
            handle.max_length(),
            handle.hidden_size()
        );
        Ok(handle)
    }

    fn load_with_profile(settings: &ModelSettings, requested: RuntimeProfile) -> Result<Self> {
        let source = ModelSource::from_identifier(&settings.model_id);
        let artifacts = artifacts::resolve_artifacts(
            &source,
            &settings.onnx_files,
            requested.precision,
            settings.hf_token.clone(),
        )
        .with_context(|| format!("Failed to resolve artifacts for {}", settings.model_id))?;

        let profile = effective_profile(requested, artifacts.precision);

        let max_length = artifacts::resolve_max_length(settings.max_seq_length, &artifacts)?;
        let tokenizer = BatchTokenizer::from_file(&artifacts.tokenizer, max_length)?;

        let probe = tokenizer
            .encode_batch(&[PROBE_TEXT.to_string()])
            .context("Tokenizer failed on the probe text")?;
        let encoder = OnnxEncoder::load(
            &artifacts.onnx_model,
            profile,
            settings.intra_threads,
            &probe,
        )?;

        Ok(Self::new(
            settings.model_id.clone(),
            tokenizer,
            Arc::new(encoder),
            profile,
            settings.pooling,
        ))
    }

    /// Embeds `texts` into unit-length vectors, one per input, in input order.
    ///
    /// An empty input returns immediately without touching the tokenizer or
    /// the encoder.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch = self.tokenizer.encode_batch(texts)?;
        debug!(
            "Tokenized {} texts to [{}, {}]",
            texts.len(),
            batch.batch_size(),
            batch.seq_len()
        );

        let hidden = self.encoder.forward(&batch)?;
        let (hidden_batch, hidden_seq, _) = hidden.dim();
        if hidden_batch != batch.batch_size() || hidden_seq != batch.seq_len() {
            return Err(EmbedError::Shape {
                actual: hidden.shape().to_vec(),
                batch: batch.batch_size(),
                seq_len: batch.seq_len(),
            });
        }

        let pooled = self.pooling.pool(hidden.view(), batch.attention_mask.view());
        let normalized = l2_normalize(pooled);

        Ok(normalized.outer_iter().map(|row| row.to_vec()).collect())
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn device(&self) -> Device {
        self.profile.device
    }

    pub fn profile(&self) -> RuntimeProfile {
        self.profile
    }

    pub fn pooling(&self) -> PoolingStrategy {
        self.pooling
    }

    pub fn hidden_size(&self) -> usize {
        self.encoder.hidden_size()
    }

    pub fn max_length(&self) -> usize {
        self.tokenizer.max_length()
    }
}

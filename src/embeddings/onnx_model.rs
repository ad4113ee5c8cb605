// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ONNX Runtime encoder
//!
//! Wraps an exported transformer encoder (BERT/RoBERTa family) and returns
//! its last hidden state. Features:
//! - CUDA or CPU execution provider, chosen by the runtime profile
//! - f16 exports on CUDA, widened to f32 on the way out
//! - `token_type_ids` fed only when the graph declares it (RoBERTa exports don't)
//! - Probe inference at load time to validate the output rank and read the hidden size

use crate::embeddings::device::{Device, RuntimeProfile};
use crate::embeddings::{EmbedError, Encoder, TokenizedBatch};
use anyhow::{Context, Result};
use ndarray::{Array3, ArrayD, Ix3};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

const TOKEN_TYPE_IDS: &str = "token_type_ids";

/// Encoder backed by an ONNX Runtime session.
///
/// `Session::run` needs exclusive access, so concurrent requests serialize
/// on the session mutex.
pub struct OnnxEncoder {
    session: Mutex<Session>,

    /// Whether the graph declares a `token_type_ids` input
    uses_token_type_ids: bool,

    /// Hidden size read from the probe inference
    hidden_size: usize,

    profile: RuntimeProfile,
}

impl std::fmt::Debug for OnnxEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEncoder")
            .field("uses_token_type_ids", &self.uses_token_type_ids)
            .field("hidden_size", &self.hidden_size)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl OnnxEncoder {
    /// Loads an ONNX export and validates it with `probe`.
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found or invalid
    /// - The execution provider for `profile.device` cannot be registered
    /// - The probe inference fails or does not produce `[batch, seq_len, hidden]`
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        profile: RuntimeProfile,
        intra_threads: usize,
        probe: &TokenizedBatch,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }

        info!(
            "Initializing ONNX encoder from {} on {} ({})",
            model_path.display(),
            profile.device,
            profile.precision
        );

        let builder = Session::builder().context("Failed to create session builder")?;
        let builder = match profile.device {
            Device::Cuda => builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .build()
                    .error_on_failure()])
                .context("Failed to set CUDA execution provider")?,
            Device::Cpu => builder
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?,
        };
        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let uses_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == TOKEN_TYPE_IDS);

        let mut encoder = Self {
            session: Mutex::new(session),
            uses_token_type_ids,
            hidden_size: 0,
            profile,
        };

        let hidden = encoder
            .run(probe)
            .context("Probe inference failed while validating the encoder")?;
        encoder.hidden_size = hidden.dim().2;
        if encoder.hidden_size == 0 {
            anyhow::bail!("Encoder produced an empty hidden dimension");
        }

        info!(
            "ONNX encoder ready: hidden_size={} token_type_ids={}",
            encoder.hidden_size, encoder.uses_token_type_ids
        );
        Ok(encoder)
    }

    fn run(&self, batch: &TokenizedBatch) -> Result<Array3<f32>, EmbedError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbedError::Inference("ONNX session lock poisoned".to_string()))?;

        let mut inputs = ort::inputs![
            "input_ids" => Value::from_array(batch.input_ids.clone())?,
            "attention_mask" => Value::from_array(batch.attention_mask.clone())?
        ];
        if self.uses_token_type_ids {
            inputs.push((
                TOKEN_TYPE_IDS.into(),
                Value::from_array(batch.token_type_ids.clone())?.into(),
            ));
        }

        let outputs = session.run(inputs)?;

        // Index [0] rather than a name: exports disagree on what to call the last hidden state
        let hidden: ArrayD<f32> = match outputs[0].try_extract_array::<f32>() {
            Ok(view) => view.to_owned(),
            Err(_) => outputs[0]
                .try_extract_array::<half::f16>()?
                .mapv(|v| v.to_f32()),
        };

        let shape = hidden.shape().to_vec();
        if shape.len() != 3 || shape[0] != batch.batch_size() || shape[1] != batch.seq_len() {
            return Err(EmbedError::Shape {
                actual: shape,
                batch: batch.batch_size(),
                seq_len: batch.seq_len(),
            });
        }

        Ok(hidden.into_dimensionality::<Ix3>()?)
    }
}

impl Encoder for OnnxEncoder {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn forward(&self, batch: &TokenizedBatch) -> Result<Array3<f32>, EmbedError> {
        self.run(batch)
    }
}

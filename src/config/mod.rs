// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Process configuration, read once at startup from flags or environment.

use crate::embeddings::artifacts::OnnxFiles;
use crate::embeddings::{DevicePreference, ModelSettings, PoolingStrategy};
use clap::Parser;
use std::net::SocketAddr;

pub const DEFAULT_MODEL_ID: &str = "microsoft/graphcodebert-base";

/// Embed Node configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "embed-node")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Serves L2-normalized text embeddings over HTTP", long_about = None)]
pub struct ServiceConfig {
    /// Hugging Face Hub model id or path to a local model directory
    #[arg(long, env = "MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Pooling strategy: `mean` or `cls` (other values fall back to mean)
    #[arg(long, env = "POOLING", default_value = "mean")]
    pub pooling: String,

    /// Compute device
    #[arg(long, env = "DEVICE", value_enum, default_value_t = DevicePreference::Auto)]
    pub device: DevicePreference,

    /// Full-precision ONNX export, relative to the model repository
    #[arg(long, env = "ONNX_FILE", default_value = "onnx/model.onnx")]
    pub onnx_file: String,

    /// Half-precision ONNX export, preferred on CUDA
    #[arg(long, env = "ONNX_FP16_FILE", default_value = "onnx/model_fp16.onnx")]
    pub onnx_fp16_file: String,

    /// Truncation length; derived from the model configs when unset
    #[arg(long, env = "MAX_SEQ_LENGTH")]
    pub max_seq_length: Option<usize>,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// Address to bind
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Token for gated or private Hub repositories
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,
}

impl ServiceConfig {
    /// Resolves the pooling setting once; request handling only sees the enum.
    pub fn pooling_strategy(&self) -> PoolingStrategy {
        PoolingStrategy::from_setting(&self.pooling)
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model_id: self.model_id.clone(),
            pooling: self.pooling_strategy(),
            device: self.device,
            onnx_files: OnnxFiles {
                full_precision: self.onnx_file.clone(),
                half_precision: self.onnx_fp16_file.clone(),
            },
            max_seq_length: self.max_seq_length,
            intra_threads: self.intra_threads,
            hf_token: self.hf_token.clone(),
        }
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", addr, e))
    }
}

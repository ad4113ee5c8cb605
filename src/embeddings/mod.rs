// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Text embedding pipeline: tokenize, encode, pool, normalize.

pub mod artifacts;
pub mod device;
pub mod encoder;
pub mod error;
pub mod onnx_model;
pub mod pooling;
pub mod runtime;
pub mod tokenization;

pub use device::{Device, DevicePreference, Precision, RuntimeProfile};
pub use encoder::Encoder;
pub use error::EmbedError;
pub use onnx_model::OnnxEncoder;
pub use pooling::PoolingStrategy;
pub use runtime::{ModelHandle, ModelSettings};
pub use tokenization::{BatchTokenizer, TokenizedBatch};

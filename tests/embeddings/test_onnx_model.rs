// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Real-model tests for the ONNX encoder
//!
//! Need a local GraphCodeBERT export (tokenizer.json, config.json and
//! onnx/model.onnx) under MODEL_DIR, so they are ignored by default:
//!
//! ```text
//! cargo test --test embeddings_tests -- --ignored
//! ```

use crate::common::norm;
use embed_node::embeddings::artifacts::OnnxFiles;
use embed_node::embeddings::{DevicePreference, ModelHandle, ModelSettings, PoolingStrategy};

const MODEL_DIR: &str = "/workspace/models/graphcodebert-onnx";
const HIDDEN_SIZE: usize = 768;

fn settings(pooling: PoolingStrategy) -> ModelSettings {
    ModelSettings {
        model_id: MODEL_DIR.to_string(),
        pooling,
        device: DevicePreference::Cpu,
        onnx_files: OnnxFiles {
            full_precision: "onnx/model.onnx".to_string(),
            half_precision: "onnx/model_fp16.onnx".to_string(),
        },
        max_seq_length: None,
        intra_threads: 4,
        hf_token: None,
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod onnx_model_tests {
    use super::*;

    #[test]
    #[ignore = "requires a local ONNX export"]
    fn test_model_loads_with_expected_dimension() {
        let handle = ModelHandle::load(&settings(PoolingStrategy::Mean))
            .expect("Failed to load model");

        assert_eq!(handle.hidden_size(), HIDDEN_SIZE);
        assert_eq!(handle.max_length(), 512);
        assert_eq!(handle.device().as_str(), "cpu");
    }

    #[test]
    #[ignore = "requires a local ONNX export"]
    fn test_code_snippet_embedding() {
        let handle = ModelHandle::load(&settings(PoolingStrategy::Mean))
            .expect("Failed to load model");

        let vectors = handle
            .embed(&["def add(a, b): return a + b".to_string()])
            .unwrap();

        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), HIDDEN_SIZE);
        assert!(vectors[0].iter().all(|v| v.is_finite()));
        assert!((norm(&vectors[0]) - 1.0).abs() < 1e-4);
    }

    #[test]
    #[ignore = "requires a local ONNX export"]
    fn test_similar_code_scores_higher() {
        let handle = ModelHandle::load(&settings(PoolingStrategy::Mean))
            .expect("Failed to load model");

        let vectors = handle
            .embed(&[
                "def add(a, b): return a + b".to_string(),
                "def sum_two(x, y): return x + y".to_string(),
                "The weather in Paris is mild in spring.".to_string(),
            ])
            .unwrap();

        let related = cosine(&vectors[0], &vectors[1]);
        let unrelated = cosine(&vectors[0], &vectors[2]);
        assert!(related > unrelated, "{} <= {}", related, unrelated);
    }

    #[test]
    #[ignore = "requires a local ONNX export"]
    fn test_cls_pooling_unit_length() {
        let handle = ModelHandle::load(&settings(PoolingStrategy::Cls))
            .expect("Failed to load model");
        let long = "x = 1\n".repeat(2000);

        let vectors = handle.embed(&[long, String::new()]).unwrap();

        assert_eq!(vectors.len(), 2);
        for vector in &vectors {
            assert_eq!(vector.len(), HIDDEN_SIZE);
            assert!((norm(vector) - 1.0).abs() < 1e-4);
        }
    }
}

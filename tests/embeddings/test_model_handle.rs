// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! ModelHandle pipeline tests
//!
//! Tokenize, encode, pool and normalize against the fixture tokenizer and
//! the fake encoder. No model files are needed.

use crate::common::{norm, test_handle, texts, FakeEncoder, HIDDEN_SIZE, TEST_MODEL_ID};
use embed_node::embeddings::{Device, PoolingStrategy};
use std::sync::Arc;

#[cfg(test)]
mod model_handle_tests {
    use super::*;

    #[test]
    fn test_one_vector_per_text_in_order() {
        let handle = test_handle(Arc::new(FakeEncoder::new(HIDDEN_SIZE)), PoolingStrategy::Mean);

        let batch = handle
            .embed(&texts(&["hello world", "fn main", "return a + b"]))
            .unwrap();
        let singles: Vec<Vec<f32>> = ["hello world", "fn main", "return a + b"]
            .iter()
            .map(|t| handle.embed(&texts(&[t])).unwrap().remove(0))
            .collect();

        assert_eq!(batch.len(), 3);
        // Padding to the longest text must not change shorter rows
        for (row, single) in batch.iter().zip(&singles) {
            for (a, b) in row.iter().zip(single) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_vectors_are_unit_length() {
        for pooling in [PoolingStrategy::Mean, PoolingStrategy::Cls] {
            let handle = test_handle(Arc::new(FakeEncoder::new(HIDDEN_SIZE)), pooling);

            let vectors = handle
                .embed(&texts(&["hello", "embedding vector search", ""]))
                .unwrap();

            for vector in &vectors {
                assert!(
                    (norm(vector) - 1.0).abs() < 1e-5,
                    "{} vector has norm {}",
                    pooling,
                    norm(vector)
                );
            }
        }
    }

    #[test]
    fn test_dimension_constant_across_inputs() {
        let handle = test_handle(Arc::new(FakeEncoder::new(HIDDEN_SIZE)), PoolingStrategy::Mean);
        let long = vec!["vector"; 100].join(" ");

        let small = handle.embed(&texts(&["a"])).unwrap();
        let large = handle
            .embed(&texts(&["a", "b", &long, "def add(a, b): return a + b"]))
            .unwrap();

        assert_eq!(handle.hidden_size(), HIDDEN_SIZE);
        assert!(small.iter().chain(&large).all(|v| v.len() == HIDDEN_SIZE));
    }

    #[test]
    fn test_long_text_is_truncated() {
        let handle = test_handle(Arc::new(FakeEncoder::new(HIDDEN_SIZE)), PoolingStrategy::Mean);
        // Everything past max_length (16 incl. specials) is dropped
        let prefix = vec!["hello"; 14].join(" ");
        let a = format!("{} world world world", prefix);
        let b = format!("{} again again again again", prefix);

        let vectors = handle.embed(&texts(&[&a, &b])).unwrap();

        assert_eq!(handle.max_length(), 16);
        for (x, y) in vectors[0].iter().zip(&vectors[1]) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_deterministic() {
        let handle = test_handle(Arc::new(FakeEncoder::new(HIDDEN_SIZE)), PoolingStrategy::Cls);
        let input = texts(&["hello world", "def add"]);

        assert_eq!(handle.embed(&input).unwrap(), handle.embed(&input).unwrap());
    }

    #[test]
    fn test_empty_input_skips_encoder() {
        let encoder = Arc::new(FakeEncoder::new(HIDDEN_SIZE));
        let handle = test_handle(encoder.clone(), PoolingStrategy::Mean);

        let vectors = handle.embed(&[]).unwrap();

        assert!(vectors.is_empty());
        assert_eq!(encoder.calls(), 0);
    }

    #[test]
    fn test_one_forward_pass_per_call() {
        let encoder = Arc::new(FakeEncoder::new(HIDDEN_SIZE));
        let handle = test_handle(encoder.clone(), PoolingStrategy::Mean);

        handle.embed(&texts(&["a", "b", "hello"])).unwrap();

        assert_eq!(encoder.calls(), 1);
    }

    #[test]
    fn test_accessors() {
        let handle = test_handle(Arc::new(FakeEncoder::new(HIDDEN_SIZE)), PoolingStrategy::Cls);

        assert_eq!(handle.model_id(), TEST_MODEL_ID);
        assert_eq!(handle.device(), Device::Cpu);
        assert_eq!(handle.pooling(), PoolingStrategy::Cls);
    }
}

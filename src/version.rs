// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Embed Node

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "mean-pooling",
    "cls-pooling",
    "l2-normalization",
    "cuda-fp16",
    "hf-hub-artifacts",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Embed Node {} [{}]", VERSION_NUMBER, FEATURES.join(", "))
}

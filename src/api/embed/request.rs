// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedRequest type for POST /embed

use serde::{Deserialize, Serialize};

/// Request body for POST /embed
///
/// # Example
/// ```json
/// {
///   "texts": ["def add(a, b): return a + b", "hello world"]
/// }
/// ```
///
/// `texts` is required and may be empty. There are no limits on count or
/// length; overlong texts are truncated by the tokenizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub texts: Vec<String>,
}

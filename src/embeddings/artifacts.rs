// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model artifact resolution
//!
//! A model identifier is either a local directory holding an exported model
//! or a Hugging Face Hub repository id. Hub files are downloaded once into
//! the hub cache (`HF_HOME`) at startup and reused on later starts.

use crate::embeddings::device::Precision;
use anyhow::{anyhow, Context, Result};
use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";
pub const MODEL_CONFIG_FILE: &str = "config.json";

/// Used when neither the settings nor the model configs give a limit
pub const DEFAULT_MAX_LENGTH: usize = 512;

/// `model_max_length` values above this are tokenizer placeholders, not limits
const MAX_SANE_MODEL_LENGTH: u64 = 100_000;

/// Where a model's files come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    LocalDir(PathBuf),
    Hub(String),
}

impl ModelSource {
    /// Existing directories win over hub ids of the same spelling
    pub fn from_identifier(model_id: &str) -> Self {
        let path = Path::new(model_id);
        if path.is_dir() {
            ModelSource::LocalDir(path.to_path_buf())
        } else {
            ModelSource::Hub(model_id.to_string())
        }
    }
}

/// ONNX file names inside the model repository
#[derive(Debug, Clone)]
pub struct OnnxFiles {
    pub full_precision: String,
    pub half_precision: String,
}

/// Local paths to everything needed to build a model handle
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub tokenizer: PathBuf,
    pub onnx_model: PathBuf,
    pub tokenizer_config: Option<PathBuf>,
    pub model_config: Option<PathBuf>,
    /// Precision of the ONNX export actually resolved
    pub precision: Precision,
}

enum ArtifactStore {
    Local(PathBuf),
    Hub { model_id: String, repo: ApiRepo },
}

impl ArtifactStore {
    fn open(source: &ModelSource, hf_token: Option<String>) -> Result<Self> {
        match source {
            ModelSource::LocalDir(dir) => Ok(ArtifactStore::Local(dir.clone())),
            ModelSource::Hub(model_id) => {
                let api = ApiBuilder::new()
                    .with_progress(false)
                    .with_token(hf_token)
                    .build()
                    .context("Failed to initialize Hugging Face Hub client")?;
                Ok(ArtifactStore::Hub {
                    model_id: model_id.clone(),
                    repo: api.model(model_id.clone()),
                })
            }
        }
    }

    fn get(&self, file: &str) -> Result<PathBuf> {
        match self {
            ArtifactStore::Local(dir) => {
                let path = dir.join(file);
                if !path.is_file() {
                    return Err(anyhow!("{} not found in {}", file, dir.display()));
                }
                Ok(path)
            }
            ArtifactStore::Hub { model_id, repo } => repo
                .get(file)
                .with_context(|| format!("Failed to fetch {} from {}", file, model_id)),
        }
    }

    fn get_optional(&self, file: &str) -> Option<PathBuf> {
        match self.get(file) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("Optional artifact unavailable: {:#}", e);
                None
            }
        }
    }
}

/// Resolves (and downloads if needed) the tokenizer, ONNX export and configs.
///
/// With `Precision::F16` the half-precision export is preferred; when the
/// repository has none, the full-precision export is used and the returned
/// artifacts report `Precision::F32`.
pub fn resolve_artifacts(
    source: &ModelSource,
    onnx_files: &OnnxFiles,
    precision: Precision,
    hf_token: Option<String>,
) -> Result<ModelArtifacts> {
    info!("Resolving model artifacts for {:?}", source);
    let store = ArtifactStore::open(source, hf_token)?;

    let tokenizer = store.get(TOKENIZER_FILE)?;

    let (onnx_model, precision) = match precision {
        Precision::F16 => match store.get_optional(&onnx_files.half_precision) {
            Some(path) => (path, Precision::F16),
            None => {
                warn!(
                    "No half-precision export at {}, using {} in f32",
                    onnx_files.half_precision, onnx_files.full_precision
                );
                (store.get(&onnx_files.full_precision)?, Precision::F32)
            }
        },
        Precision::F32 => (store.get(&onnx_files.full_precision)?, Precision::F32),
    };

    let artifacts = ModelArtifacts {
        tokenizer,
        onnx_model,
        tokenizer_config: store.get_optional(TOKENIZER_CONFIG_FILE),
        model_config: store.get_optional(MODEL_CONFIG_FILE),
        precision,
    };
    info!(
        "Resolved tokenizer={} onnx={}",
        artifacts.tokenizer.display(),
        artifacts.onnx_model.display()
    );
    Ok(artifacts)
}

fn read_json(path: &Path) -> Result<Value> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Maximum sequence length for truncation.
///
/// Priority: explicit setting, `model_max_length` from the tokenizer config,
/// `max_position_embeddings` from the model config (minus the two reserved
/// positions on RoBERTa), then [`DEFAULT_MAX_LENGTH`].
pub fn max_length_from_configs(
    explicit: Option<usize>,
    tokenizer_config: Option<&Value>,
    model_config: Option<&Value>,
) -> usize {
    if let Some(max_length) = explicit {
        return max_length;
    }

    let from_tokenizer = tokenizer_config
        .and_then(|cfg| cfg.get("model_max_length"))
        .and_then(Value::as_u64)
        .filter(|&len| len > 0 && len <= MAX_SANE_MODEL_LENGTH);
    if let Some(len) = from_tokenizer {
        return len as usize;
    }

    let from_model = model_config.and_then(|cfg| {
        let positions = cfg.get("max_position_embeddings")?.as_u64()?;
        let reserved = match cfg.get("model_type").and_then(Value::as_str) {
            Some("roberta") | Some("xlm-roberta") | Some("camembert") => 2,
            _ => 0,
        };
        positions.checked_sub(reserved).filter(|&len| len > 0)
    });

    from_model.map(|len| len as usize).unwrap_or(DEFAULT_MAX_LENGTH)
}

/// Reads the config files named in `artifacts` and applies [`max_length_from_configs`]
pub fn resolve_max_length(explicit: Option<usize>, artifacts: &ModelArtifacts) -> Result<usize> {
    let tokenizer_config = artifacts
        .tokenizer_config
        .as_deref()
        .map(read_json)
        .transpose()?;
    let model_config = artifacts
        .model_config
        .as_deref()
        .map(read_json)
        .transpose()?;
    Ok(max_length_from_configs(
        explicit,
        tokenizer_config.as_ref(),
        model_config.as_ref(),
    ))
}

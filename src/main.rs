// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use embed_node::{
    api::{start_server, AppState},
    config::ServiceConfig,
    embeddings::ModelHandle,
    version,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServiceConfig::parse();
    info!("Starting {}", version::get_version_string());
    info!(
        "Model: {} | pooling: {} | device preference: {:?}",
        config.model_id,
        config.pooling_strategy(),
        config.device
    );

    let addr = config.listen_addr()?;
    let settings = config.model_settings();

    // Load model/tokenizer once before serving (first cold start may download)
    let loaded = tokio::task::spawn_blocking(move || ModelHandle::load(&settings)).await?;
    let handle = match loaded {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to load model {}: {:#}", config.model_id, e);
            error!("Refusing to serve without a model");
            std::process::exit(1);
        }
    };
    let profile = handle.profile();
    info!(
        "Model ready on {} ({}), hidden size {}",
        profile.device,
        profile.precision,
        handle.hidden_size()
    );

    start_server(AppState::new(Arc::new(handle)), addr).await
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Compute device and numeric precision selection.
//!
//! The encoder runs on CUDA when the CUDA execution provider is usable and on
//! the CPU otherwise. Half precision is only used on the accelerator; CPU
//! kernels for f16 are slow or missing.
//!
//! A CUDA-enabled ONNX Runtime build reports the provider as available even
//! on hosts without a GPU, so the profile picked here is only a first choice.
//! The real check is registering the provider on a session; see
//! [`after_cuda_attempt`].

use anyhow::{bail, Result};
use clap::ValueEnum;
use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
use std::fmt;
use tracing::{info, warn};

/// Device the ONNX session executes on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Floating point width of the encoder weights and activations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    F32,
    F16,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::F32 => f.write_str("f32"),
            Precision::F16 => f.write_str("f16"),
        }
    }
}

/// Requested device, from the `DEVICE` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DevicePreference {
    /// CUDA when available, CPU otherwise
    #[default]
    Auto,
    Cpu,
    Cuda,
}

/// Device and precision the model handle is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeProfile {
    pub device: Device,
    pub precision: Precision,
}

impl RuntimeProfile {
    pub fn cpu() -> Self {
        Self {
            device: Device::Cpu,
            precision: Precision::F32,
        }
    }

    pub fn cuda() -> Self {
        Self {
            device: Device::Cuda,
            precision: Precision::F16,
        }
    }

    /// Same device, forced to full precision
    pub fn with_full_precision(self) -> Self {
        Self {
            precision: Precision::F32,
            ..self
        }
    }
}

/// Picks the runtime profile for a device preference given whether CUDA is usable.
pub fn select_profile(preference: DevicePreference, cuda_available: bool) -> Result<RuntimeProfile> {
    match (preference, cuda_available) {
        (DevicePreference::Cpu, _) => Ok(RuntimeProfile::cpu()),
        (DevicePreference::Auto, true) | (DevicePreference::Cuda, true) => {
            Ok(RuntimeProfile::cuda())
        }
        (DevicePreference::Auto, false) => Ok(RuntimeProfile::cpu()),
        (DevicePreference::Cuda, false) => {
            bail!("DEVICE=cuda requested but the CUDA execution provider is not available")
        }
    }
}

/// Result of trying to bring up the encoder on CUDA
#[derive(Debug)]
pub enum CudaOutcome<T> {
    Ready(T),
    /// CUDA failed under `DEVICE=auto`; retry on the CPU profile
    FallBackToCpu,
}

/// Decides what a failed (or successful) CUDA load means for `preference`.
///
/// Under `auto` a CUDA failure is logged and the caller retries on the CPU.
/// An explicit `cuda` preference makes the failure fatal.
pub fn after_cuda_attempt<T>(
    preference: DevicePreference,
    attempt: Result<T>,
) -> Result<CudaOutcome<T>> {
    match (attempt, preference) {
        (Ok(loaded), _) => Ok(CudaOutcome::Ready(loaded)),
        (Err(e), DevicePreference::Auto) => {
            warn!("CUDA execution provider failed: {:#}", e);
            warn!("Falling back to CPU execution provider");
            Ok(CudaOutcome::FallBackToCpu)
        }
        (Err(e), _) => Err(e.context("DEVICE=cuda requested but the CUDA session failed")),
    }
}

/// Probes ONNX Runtime for CUDA support and selects the runtime profile.
pub fn detect_runtime(preference: DevicePreference) -> Result<RuntimeProfile> {
    let cuda_available = if preference == DevicePreference::Cpu {
        false
    } else {
        match CUDAExecutionProvider::default().is_available() {
            Ok(available) => available,
            Err(e) => {
                warn!("Could not query CUDA execution provider: {}", e);
                false
            }
        }
    };

    let profile = select_profile(preference, cuda_available)?;
    info!(
        "Runtime profile: device={} precision={} (preference {:?})",
        profile.device, profile.precision, preference
    );
    Ok(profile)
}

//! Heterogeneous execution dispatcher for the grayscale benchmark.
//!
//! Discovers compute devices across platforms, ranks them per class, and
//! runs the grayscale transform through one of four strategies while timing
//! only the transform itself.
//!
//! # Architecture
//!
//! ```text
//! Dispatcher
//!     └── ExecutionStrategy
//!             ├── Reference     (host thread, sequential)
//!             ├── SingleDevice  (best device of one class)
//!             └── SplitDevice   (best CPU + best GPU, 50/50 by pixel count)
//!                     └── DeviceBackend trait
//!                             ├── HostDevice   (rayon pool)
//!                             ├── OpenClDevice (opencl3, `opencl` feature)
//!                             └── WgpuDevice   (wgpu, `wgpu` feature)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use graybench_compute::{DeviceCatalog, Dispatcher, KernelSource, PlatformConfig, StrategyKind};
//!
//! let platforms = graybench_compute::enumerate_platforms(&PlatformConfig::from_env());
//! let catalog = DeviceCatalog::discover(&platforms)?;
//! let kernels = KernelSource::builtin();
//!
//! let dispatcher = Dispatcher::new(&catalog, &kernels);
//! let result = dispatcher.dispatch(StrategyKind::Split, &image)?;
//! println!("{:.3} ms", result.elapsed_ms());
//! ```

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod strategy;
mod shaders;

pub use backend::{
    DeviceBackend, DeviceCatalog, DeviceClass, DeviceDescriptor, DeviceProgram, HostDevice,
    HostPlatform, PendingLaunch, Platform, describe_devices, enumerate_platforms, pick_best, rank,
};
pub use config::PlatformConfig;
pub use dispatcher::{Dispatcher, ExecutionResult};
pub use shaders::KernelSource;
pub use strategy::{
    ExecutionStrategy, Reference, SingleDevice, SplitDevice, StrategyKind, split_point,
};

use std::path::PathBuf;

use thiserror::Error;

/// Compute errors.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("No compute platform found")]
    NoPlatform,

    #[error("No compute device found on any platform")]
    NoDevice,

    #[error("No {0} device available")]
    MissingDeviceClass(DeviceClass),

    #[error("Failed to build kernel for {device}: {log}")]
    KernelBuild { device: String, log: String },

    #[error("Execution failed on {device}: {message}")]
    Execution { device: String, message: String },

    #[error("Failed to load kernel source {path}: {source}")]
    KernelSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Platform query failed: {0}")]
    Platform(String),

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Core(#[from] graybench_core::Error),
}

impl ComputeError {
    pub(crate) fn execution(device: &str, message: impl Into<String>) -> Self {
        Self::Execution {
            device: device.to_string(),
            message: message.into(),
        }
    }
}

pub type ComputeResult<T> = Result<T, ComputeError>;

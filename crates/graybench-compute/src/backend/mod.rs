//! Compute platforms and devices.
//!
//! A [`Platform`] lists devices of one [`DeviceClass`]. Each device carries a
//! [`DeviceBackend`] that compiles a [`KernelSource`] into a
//! [`DeviceProgram`]. Running a program is split into a non-blocking
//! [`DeviceProgram::submit`] and a blocking [`PendingLaunch::wait_into`] so a
//! caller can keep two devices busy at once.
//!
//! # Architecture
//!
//! ```text
//! Platform ──► DeviceDescriptor ──► DeviceBackend::build ──► DeviceProgram
//!                                                              │ submit
//!                                                              ▼
//!                                                         PendingLaunch ──► wait_into
//! ```

mod detect;
mod host_backend;

#[cfg(feature = "opencl")]
mod opencl_backend;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use detect::{
    DeviceCatalog, DeviceClass, DeviceDescriptor, describe_devices, pick_best, rank,
};
pub use host_backend::{HostDevice, HostPlatform};

#[cfg(feature = "opencl")]
pub use opencl_backend::{OpenClDevice, OpenClPlatform};

#[cfg(feature = "wgpu")]
pub use wgpu_backend::{WgpuDevice, WgpuPlatform};

use graybench_core::Rgb8;

use crate::{ComputeResult, KernelSource, PlatformConfig};

/// A device able to compile the grayscale kernel.
pub trait DeviceBackend: Send + Sync {
    /// Compiles `source` for this device.
    ///
    /// Fails with [`crate::ComputeError::KernelBuild`] carrying the build log.
    fn build(&self, source: &KernelSource) -> ComputeResult<Box<dyn DeviceProgram>>;
}

/// A compiled kernel bound to one device.
pub trait DeviceProgram: Send + Sync {
    /// Starts transforming `input` and returns without waiting for it.
    ///
    /// The input is copied to the device before this returns.
    fn submit<'a>(&'a self, input: &[Rgb8]) -> ComputeResult<Box<dyn PendingLaunch + 'a>>;

    /// Submits and waits in one step.
    fn run(&self, input: &[Rgb8], output: &mut [Rgb8]) -> ComputeResult<()> {
        self.submit(input)?.wait_into(output)
    }
}

/// An in-flight kernel launch.
pub trait PendingLaunch {
    /// Blocks until the launch completes and copies its result into `output`.
    fn wait_into(self: Box<Self>, output: &mut [Rgb8]) -> ComputeResult<()>;
}

/// A source of devices (the host, an OpenCL ICD, a wgpu backend).
pub trait Platform: Send + Sync {
    fn name(&self) -> &str;

    /// Devices of `class` in platform order.
    fn devices(&self, class: DeviceClass) -> ComputeResult<Vec<DeviceDescriptor>>;
}

/// Every platform enabled by `config` and compiled into this build.
pub fn enumerate_platforms(config: &PlatformConfig) -> Vec<Box<dyn Platform>> {
    #[allow(unused_mut)]
    let mut platforms: Vec<Box<dyn Platform>> = Vec::new();

    #[cfg(feature = "opencl")]
    if config.opencl {
        for platform in OpenClPlatform::enumerate() {
            platforms.push(Box::new(platform));
        }
    }

    #[cfg(feature = "wgpu")]
    if config.wgpu {
        for platform in WgpuPlatform::enumerate() {
            platforms.push(Box::new(platform));
        }
    }

    let platforms = with_host(platforms, config);
    tracing::debug!(count = platforms.len(), "enumerated platforms");
    platforms
}

/// Appends the host platform if `config` enables it.
///
/// The host goes last so that an accelerator device with the same score is
/// ranked ahead of it.
fn with_host(
    mut platforms: Vec<Box<dyn Platform>>,
    config: &PlatformConfig,
) -> Vec<Box<dyn Platform>> {
    if config.host_enabled() {
        platforms.push(Box::new(HostPlatform::new(config)));
    }
    platforms
}

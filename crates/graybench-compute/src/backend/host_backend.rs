//! Host platform: devices backed by a dedicated rayon pool.
//!
//! The host always offers one CPU-class device. With
//! [`PlatformConfig::emulate_gpu`] it also offers a GPU-class device with the
//! same implementation, which lets the GPU and split strategies run on
//! machines without a GPU runtime.
//!
//! Host devices run the native transform. A kernel source only has to declare
//! the entry point; its body is never executed here.

use std::sync::{Arc, mpsc};

use graybench_core::{Rgb8, grayscale};
use rayon::prelude::*;

use super::{DeviceBackend, DeviceClass, DeviceDescriptor, DeviceProgram, PendingLaunch, Platform};
use crate::{ComputeError, ComputeResult, KernelSource, PlatformConfig};

const PLATFORM_NAME: &str = "Host";
const CPU_DEVICE_NAME: &str = "Host CPU";
const GPU_DEVICE_NAME: &str = "Host GPU (emulated)";

/// The in-process platform.
#[derive(Debug, Clone)]
pub struct HostPlatform {
    threads: usize,
    clock_mhz: u32,
    emulate_gpu: bool,
}

impl HostPlatform {
    pub fn new(config: &PlatformConfig) -> Self {
        let clock_mhz = sys_info::cpu_speed()
            .ok()
            .and_then(|mhz| u32::try_from(mhz).ok())
            .unwrap_or(0);
        Self {
            threads: config.effective_host_threads(),
            clock_mhz,
            emulate_gpu: config.emulate_gpu,
        }
    }

    fn descriptor(&self, name: &str, class: DeviceClass) -> DeviceDescriptor {
        let units = u32::try_from(self.threads).unwrap_or(u32::MAX);
        DeviceDescriptor::new(
            name,
            PLATFORM_NAME,
            class,
            units,
            self.clock_mhz,
            Arc::new(HostDevice::new(name, self.threads)),
        )
    }
}

impl Platform for HostPlatform {
    fn name(&self) -> &str {
        PLATFORM_NAME
    }

    fn devices(&self, class: DeviceClass) -> ComputeResult<Vec<DeviceDescriptor>> {
        Ok(match class {
            DeviceClass::Cpu => vec![self.descriptor(CPU_DEVICE_NAME, class)],
            DeviceClass::Gpu if self.emulate_gpu => vec![self.descriptor(GPU_DEVICE_NAME, class)],
            DeviceClass::Gpu => Vec::new(),
        })
    }
}

/// A host device: builds a worker pool of `threads` threads.
#[derive(Debug, Clone)]
pub struct HostDevice {
    name: String,
    threads: usize,
}

impl HostDevice {
    pub fn new(name: impl Into<String>, threads: usize) -> Self {
        Self {
            name: name.into(),
            threads: threads.max(1),
        }
    }
}

impl DeviceBackend for HostDevice {
    fn build(&self, source: &KernelSource) -> ComputeResult<Box<dyn DeviceProgram>> {
        if !source.declares_opencl_kernel() {
            return Err(ComputeError::KernelBuild {
                device: self.name.clone(),
                log: format!("no `__kernel void {}` in kernel source", source.entry_point()),
            });
        }
        if !source.is_builtin() {
            tracing::warn!(
                device = %self.name,
                "custom kernel source is not executed on host devices"
            );
        }

        let prefix = self.name.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(move |i| format!("{prefix} #{i}"))
            .panic_handler(|_| tracing::error!("host worker panicked"))
            .build()
            .map_err(|e| ComputeError::KernelBuild {
                device: self.name.clone(),
                log: e.to_string(),
            })?;

        Ok(Box::new(HostProgram {
            name: self.name.clone(),
            pool,
        }))
    }
}

struct HostProgram {
    name: String,
    pool: rayon::ThreadPool,
}

impl DeviceProgram for HostProgram {
    fn submit<'a>(&'a self, input: &[Rgb8]) -> ComputeResult<Box<dyn PendingLaunch + 'a>> {
        let data = input.to_vec();
        let (tx, rx) = mpsc::channel();
        self.pool.spawn(move || {
            let out: Vec<Rgb8> = data.par_iter().map(|&px| grayscale(px)).collect();
            let _ = tx.send(out);
        });
        Ok(Box::new(HostLaunch {
            device: &self.name,
            len: input.len(),
            rx,
        }))
    }
}

struct HostLaunch<'a> {
    device: &'a str,
    len: usize,
    rx: mpsc::Receiver<Vec<Rgb8>>,
}

impl PendingLaunch for HostLaunch<'_> {
    fn wait_into(self: Box<Self>, output: &mut [Rgb8]) -> ComputeResult<()> {
        if output.len() != self.len {
            return Err(ComputeError::BufferSizeMismatch {
                expected: self.len,
                actual: output.len(),
            });
        }
        let result = self
            .rx
            .recv()
            .map_err(|_| ComputeError::execution(self.device, "host worker terminated"))?;
        output.copy_from_slice(&result);
        Ok(())
    }
}

//! OpenCL platforms and devices.
//!
//! Requires the `opencl` feature and an installed OpenCL ICD loader.

use std::ffi::c_void;
use std::sync::{Arc, Mutex};

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_GPU, Device};
use opencl3::event::Event;
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{
    Buffer, CL_MEM_COPY_HOST_PTR, CL_MEM_HOST_NO_ACCESS, CL_MEM_HOST_READ_ONLY, CL_MEM_READ_ONLY,
    CL_MEM_WRITE_ONLY,
};
use opencl3::program::Program;
use opencl3::types::{CL_BLOCKING, cl_device_id, cl_uchar};

use graybench_core::Rgb8;

use super::{DeviceBackend, DeviceClass, DeviceDescriptor, DeviceProgram, PendingLaunch, Platform};
use crate::{ComputeError, ComputeResult, KernelSource};

const BUILD_OPTIONS: &str = "-cl-std=CL1.2";

// =============================================================================
// Platform
// =============================================================================

/// One OpenCL platform (ICD).
pub struct OpenClPlatform {
    name: String,
    inner: opencl3::platform::Platform,
}

impl OpenClPlatform {
    /// All platforms the ICD loader reports. A failed query yields none.
    pub fn enumerate() -> Vec<Self> {
        match opencl3::platform::get_platforms() {
            Ok(platforms) => platforms
                .into_iter()
                .map(|inner| Self {
                    name: inner.name().unwrap_or_else(|_| "OpenCL".to_string()),
                    inner,
                })
                .collect(),
            Err(e) => {
                tracing::debug!("no OpenCL platforms: {e:?}");
                Vec::new()
            }
        }
    }

    fn describe(&self, id: cl_device_id, class: DeviceClass) -> ComputeResult<DeviceDescriptor> {
        let device = Device::new(id);
        let query = |e| ComputeError::Platform(format!("{}: {e:?}", self.name));
        let name = device.name().map_err(query)?;
        let name = name.trim_end_matches('\0').trim().to_string();
        let units = device.max_compute_units().map_err(query)?;
        let mhz = device.max_clock_frequency().map_err(query)?;
        Ok(DeviceDescriptor::new(
            name.clone(),
            self.name.clone(),
            class,
            units,
            mhz,
            Arc::new(OpenClDevice {
                id: device.id() as usize,
                name,
            }),
        ))
    }
}

impl Platform for OpenClPlatform {
    fn name(&self) -> &str {
        &self.name
    }

    fn devices(&self, class: DeviceClass) -> ComputeResult<Vec<DeviceDescriptor>> {
        let device_type = match class {
            DeviceClass::Cpu => CL_DEVICE_TYPE_CPU,
            DeviceClass::Gpu => CL_DEVICE_TYPE_GPU,
        };
        // CL_DEVICE_NOT_FOUND is reported as an error; treat every failure as empty
        let ids = self.inner.get_devices(device_type).unwrap_or_default();
        ids.into_iter().map(|id| self.describe(id, class)).collect()
    }
}

// =============================================================================
// Device
// =============================================================================

/// An OpenCL device.
pub struct OpenClDevice {
    // Raw handle stored as an integer; device ids are plain identifiers
    // owned by the ICD for the life of the process.
    id: usize,
    name: String,
}

impl DeviceBackend for OpenClDevice {
    fn build(&self, source: &KernelSource) -> ComputeResult<Box<dyn DeviceProgram>> {
        let device = Device::new(self.id as cl_device_id);
        let build_err = |log: String| ComputeError::KernelBuild {
            device: self.name.clone(),
            log,
        };

        let context = Context::from_device(&device).map_err(|e| build_err(format!("{e:?}")))?;
        let program =
            Program::create_and_build_from_source(&context, source.opencl(), BUILD_OPTIONS)
                .map_err(build_err)?;
        let kernel = Kernel::create(&program, source.entry_point())
            .map_err(|e| build_err(format!("{e:?}")))?;

        #[allow(deprecated)]
        let queue = CommandQueue::create_default(&context, 0)
            .map_err(|e| build_err(format!("{e:?}")))?;

        Ok(Box::new(OpenClProgram {
            name: self.name.clone(),
            kernel: Mutex::new(kernel),
            queue,
            context,
            _program: program,
        }))
    }
}

// =============================================================================
// Program
// =============================================================================

struct OpenClProgram {
    name: String,
    kernel: Mutex<Kernel>,
    queue: CommandQueue,
    context: Context,
    _program: Program,
}

impl OpenClProgram {
    fn err(&self, e: impl std::fmt::Debug) -> ComputeError {
        ComputeError::execution(&self.name, format!("{e:?}"))
    }
}

impl DeviceProgram for OpenClProgram {
    fn submit<'a>(&'a self, input: &[Rgb8]) -> ComputeResult<Box<dyn PendingLaunch + 'a>> {
        if input.is_empty() {
            return Ok(Box::new(OpenClLaunch {
                program: self,
                state: None,
            }));
        }

        let bytes: &[u8] = bytemuck::cast_slice(input);
        let len = bytes.len();

        // SAFETY: COPY_HOST_PTR reads `len` bytes from `bytes` during the call
        // and never writes through the pointer.
        let src = unsafe {
            Buffer::<cl_uchar>::create(
                &self.context,
                CL_MEM_READ_ONLY | CL_MEM_HOST_NO_ACCESS | CL_MEM_COPY_HOST_PTR,
                len,
                bytes.as_ptr() as *mut c_void,
            )
        }
        .map_err(|e| self.err(e))?;

        // SAFETY: no host pointer is passed.
        let dst = unsafe {
            Buffer::<cl_uchar>::create(
                &self.context,
                CL_MEM_WRITE_ONLY | CL_MEM_HOST_READ_ONLY,
                len,
                std::ptr::null_mut(),
            )
        }
        .map_err(|e| self.err(e))?;

        let kernel = self
            .kernel
            .lock()
            .map_err(|_| ComputeError::execution(&self.name, "kernel lock poisoned"))?;

        // SAFETY: argument order and types match the kernel signature
        // `(__global const uchar*, __global uchar*)`; one work item per pixel.
        let event = unsafe {
            ExecuteKernel::new(&kernel)
                .set_arg(&src)
                .set_arg(&dst)
                .set_global_work_size(input.len())
                .enqueue_nd_range(&self.queue)
        }
        .map_err(|e| self.err(e))?;
        drop(kernel);

        self.queue.flush().map_err(|e| self.err(e))?;

        Ok(Box::new(OpenClLaunch {
            program: self,
            state: Some(Launched {
                len: input.len(),
                _src: src,
                dst,
                event,
            }),
        }))
    }
}

// =============================================================================
// Launch
// =============================================================================

struct Launched {
    len: usize,
    _src: Buffer<cl_uchar>,
    dst: Buffer<cl_uchar>,
    event: Event,
}

struct OpenClLaunch<'a> {
    program: &'a OpenClProgram,
    state: Option<Launched>,
}

impl PendingLaunch for OpenClLaunch<'_> {
    fn wait_into(self: Box<Self>, output: &mut [Rgb8]) -> ComputeResult<()> {
        let OpenClLaunch { program, state } = *self;
        let expected = state.as_ref().map_or(0, |s| s.len);
        if output.len() != expected {
            return Err(ComputeError::BufferSizeMismatch {
                expected,
                actual: output.len(),
            });
        }
        let Some(state) = state else {
            return Ok(());
        };

        let out: &mut [u8] = bytemuck::cast_slice_mut(output);
        // SAFETY: `out` is exactly the size of `dst`, and the read blocks
        // until it has been filled.
        unsafe {
            program.queue.enqueue_read_buffer(
                &state.dst,
                CL_BLOCKING,
                0,
                out,
                &[state.event.get()],
            )
        }
        .map_err(|e| program.err(e))?;
        Ok(())
    }
}

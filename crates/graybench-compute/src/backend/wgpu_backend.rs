//! wgpu platforms and devices (Vulkan/Metal/DX12/GL).
//!
//! Requires the `wgpu` feature. wgpu reports neither compute units nor
//! clock speed, so every wgpu device scores 0 and ranks in discovery order.

use std::sync::{Arc, mpsc};

use graybench_core::Rgb8;
use wgpu::util::DeviceExt;

use super::{DeviceBackend, DeviceClass, DeviceDescriptor, DeviceProgram, PendingLaunch, Platform};
use crate::{ComputeError, ComputeResult, KernelSource};

/// Must match `WORKGROUP_SIZE` in `grayscale.wgsl`.
const WORKGROUP_SIZE: u32 = 64;

/// Pixels handled by one shader invocation.
const PIXELS_PER_QUAD: usize = 4;

/// Bytes per quad: three whole u32 words.
const QUAD_BYTES: usize = PIXELS_PER_QUAD * 3;

/// Device buffer size for `pixels` RGB pixels, padded to whole quads.
fn packed_len(pixels: usize) -> usize {
    pixels.div_ceil(PIXELS_PER_QUAD) * QUAD_BYTES
}

// =============================================================================
// Platform
// =============================================================================

/// Adapters of one wgpu backend.
pub struct WgpuPlatform {
    name: String,
    adapters: Vec<Arc<wgpu::Adapter>>,
}

impl WgpuPlatform {
    /// One platform per native backend that exposes at least one adapter.
    pub fn enumerate() -> Vec<Self> {
        let backends = [
            (wgpu::Backends::VULKAN, "wgpu/Vulkan"),
            (wgpu::Backends::METAL, "wgpu/Metal"),
            (wgpu::Backends::DX12, "wgpu/DX12"),
            (wgpu::Backends::GL, "wgpu/GL"),
        ];

        let mut platforms = Vec::new();
        for (backend, name) in backends {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: backend,
                ..Default::default()
            });
            let adapters: Vec<_> = instance
                .enumerate_adapters(backend)
                .into_iter()
                .map(Arc::new)
                .collect();
            if adapters.is_empty() {
                continue;
            }
            tracing::debug!(platform = name, adapters = adapters.len(), "wgpu backend available");
            platforms.push(Self {
                name: name.to_string(),
                adapters,
            });
        }
        platforms
    }
}

fn classify(device_type: wgpu::DeviceType) -> Option<DeviceClass> {
    match device_type {
        wgpu::DeviceType::Cpu => Some(DeviceClass::Cpu),
        wgpu::DeviceType::IntegratedGpu
        | wgpu::DeviceType::DiscreteGpu
        | wgpu::DeviceType::VirtualGpu => Some(DeviceClass::Gpu),
        wgpu::DeviceType::Other => None,
    }
}

impl Platform for WgpuPlatform {
    fn name(&self) -> &str {
        &self.name
    }

    fn devices(&self, class: DeviceClass) -> ComputeResult<Vec<DeviceDescriptor>> {
        let mut devices = Vec::new();
        for adapter in &self.adapters {
            let info = adapter.get_info();
            if classify(info.device_type) != Some(class) {
                continue;
            }
            devices.push(DeviceDescriptor::new(
                info.name.clone(),
                self.name.clone(),
                class,
                0,
                0,
                Arc::new(WgpuDevice {
                    name: info.name,
                    adapter: Arc::clone(adapter),
                }),
            ));
        }
        Ok(devices)
    }
}

// =============================================================================
// Device
// =============================================================================

/// A wgpu adapter.
pub struct WgpuDevice {
    name: String,
    adapter: Arc<wgpu::Adapter>,
}

impl DeviceBackend for WgpuDevice {
    fn build(&self, source: &KernelSource) -> ComputeResult<Box<dyn DeviceProgram>> {
        let build_err = |log: String| ComputeError::KernelBuild {
            device: self.name.clone(),
            log,
        };

        let (device, queue) = pollster::block_on(self.adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("graybench_device"),
                required_features: wgpu::Features::empty(),
                required_limits: self.adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| build_err(e.to_string()))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grayscale"),
            source: wgpu::ShaderSource::Wgsl(source.wgsl().into()),
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("grayscale_pipeline"),
            layout: None,
            module: &module,
            entry_point: Some(source.entry_point()),
            compilation_options: Default::default(),
            cache: None,
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(build_err(e.to_string()));
        }

        Ok(Box::new(WgpuProgram {
            name: self.name.clone(),
            device,
            queue,
            pipeline,
        }))
    }
}

// =============================================================================
// Program
// =============================================================================

struct WgpuProgram {
    name: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
}

impl WgpuProgram {
    /// Workgroup grid covering `quads`, folded into 2D past the per-dimension limit.
    fn workgroups(&self, quads: u32) -> (u32, u32) {
        let groups = quads.div_ceil(WORKGROUP_SIZE);
        let max = self.device.limits().max_compute_workgroups_per_dimension.max(1);
        if groups <= max {
            (groups, 1)
        } else {
            (max, groups.div_ceil(max))
        }
    }
}

impl DeviceProgram for WgpuProgram {
    fn submit<'a>(&'a self, input: &[Rgb8]) -> ComputeResult<Box<dyn PendingLaunch + 'a>> {
        if input.is_empty() {
            return Ok(Box::new(WgpuLaunch {
                program: self,
                state: None,
            }));
        }

        let mut bytes = bytemuck::cast_slice::<Rgb8, u8>(input).to_vec();
        bytes.resize(packed_len(input.len()), 0);
        let size = bytes.len() as u64;
        let limits = self.device.limits();
        if size > u64::from(limits.max_storage_buffer_binding_size)
            || size > limits.max_buffer_size
        {
            return Err(ComputeError::execution(
                &self.name,
                format!("{size} bytes exceeds the device storage buffer limit"),
            ));
        }
        let quads = u32::try_from(input.len().div_ceil(PIXELS_PER_QUAD))
            .map_err(|_| ComputeError::execution(&self.name, "too many pixels for one dispatch"))?;

        let src = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grayscale_src"),
            contents: &bytes,
            usage: wgpu::BufferUsages::STORAGE,
        });
        let dst = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grayscale_dst"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grayscale_staging"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grayscale_bind_group"),
            layout: &self.pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst.as_entire_binding(),
                },
            ],
        });

        let (gx, gy) = self.workgroups(quads);
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("grayscale_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("grayscale_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(gx, gy, 1);
        }
        encoder.copy_buffer_to_buffer(&dst, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = mpsc::channel();
        staging
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |r| {
                let _ = tx.send(r);
            });

        Ok(Box::new(WgpuLaunch {
            program: self,
            state: Some(Launched {
                len: input.len(),
                staging,
                rx,
            }),
        }))
    }
}

// =============================================================================
// Launch
// =============================================================================

struct Launched {
    len: usize,
    staging: wgpu::Buffer,
    rx: mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
}

struct WgpuLaunch<'a> {
    program: &'a WgpuProgram,
    state: Option<Launched>,
}

impl PendingLaunch for WgpuLaunch<'_> {
    fn wait_into(self: Box<Self>, output: &mut [Rgb8]) -> ComputeResult<()> {
        let WgpuLaunch { program, state } = *self;
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
        let name = &program.name;

        program.device.poll(wgpu::Maintain::Wait);
        state
            .rx
            .recv()
            .map_err(|_| ComputeError::execution(name, "map channel closed"))?
            .map_err(|e| ComputeError::execution(name, format!("map failed: {e}")))?;

        {
            let mapped = state.staging.slice(..).get_mapped_range();
            let out: &mut [u8] = bytemuck::cast_slice_mut(output);
            out.copy_from_slice(&mapped[..out.len()]);
        }
        state.staging.unmap();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(wgpu::DeviceType::Cpu), Some(DeviceClass::Cpu));
        assert_eq!(classify(wgpu::DeviceType::DiscreteGpu), Some(DeviceClass::Gpu));
        assert_eq!(classify(wgpu::DeviceType::IntegratedGpu), Some(DeviceClass::Gpu));
        assert_eq!(classify(wgpu::DeviceType::Other), None);
    }

    #[test]
    fn test_packed_len() {
        assert_eq!(packed_len(0), 0);
        assert_eq!(packed_len(1), 12);
        assert_eq!(packed_len(4), 12);
        assert_eq!(packed_len(5), 24);
        assert_eq!(packed_len(851) % 4, 0);

        // a 12 MP photo stays one byte per channel, under a 128 MiB binding limit
        let photo = packed_len(4000 * 3000);
        assert_eq!(photo, 36_000_000);
        assert!(photo as u64 <= 128 << 20);
    }
}

//! Execution strategies.
//!
//! Every strategy maps an input image to an output of identical dimensions
//! in which each pixel is the grayscale of the pixel at the same position.
//! Strategies differ only in where that work runs.

use std::fmt;

use graybench_core::{PixelBuffer, Rgb8, grayscale_into};

use crate::backend::{DeviceClass, DeviceDescriptor, DeviceProgram, PendingLaunch};
use crate::{ComputeResult, KernelSource};

/// Menu-level strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Sequential host loop.
    Reference,
    /// Best CPU-class device.
    Cpu,
    /// Best GPU-class device.
    Gpu,
    /// Best CPU-class and best GPU-class device, half the pixels each.
    Split,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Reference,
        StrategyKind::Cpu,
        StrategyKind::Gpu,
        StrategyKind::Split,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::Reference => "Serial",
            StrategyKind::Cpu => "CPU",
            StrategyKind::Gpu => "GPU",
            StrategyKind::Split => "CPU + GPU",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A ready-to-run strategy. Construction does device selection and kernel
/// compilation; [`run`](Self::run) does only the transform.
pub trait ExecutionStrategy {
    fn kind(&self) -> StrategyKind;

    /// Names of the devices this strategy runs on.
    fn devices(&self) -> Vec<String>;

    /// Transforms `input` into a new buffer of the same dimensions.
    fn run(&self, input: &PixelBuffer) -> ComputeResult<PixelBuffer>;
}

/// Pixels `[0, split_point(n))` go to the CPU device, the rest to the GPU device.
#[inline]
pub fn split_point(n: usize) -> usize {
    n / 2
}

// ============================================================================
// Reference
// ============================================================================

/// Plain loop on the calling thread. Ground truth for the other strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reference;

impl ExecutionStrategy for Reference {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Reference
    }

    fn devices(&self) -> Vec<String> {
        vec!["host thread".to_string()]
    }

    fn run(&self, input: &PixelBuffer) -> ComputeResult<PixelBuffer> {
        let mut output = PixelBuffer::new(input.width(), input.height())?;
        grayscale_into(input.pixels(), output.pixels_mut());
        Ok(output)
    }
}

// ============================================================================
// SingleDevice
// ============================================================================

/// All pixels on one device, one work item per pixel.
pub struct SingleDevice {
    kind: StrategyKind,
    device: String,
    program: Box<dyn DeviceProgram>,
}

impl SingleDevice {
    /// Compiles `source` for `device`.
    pub fn new(device: &DeviceDescriptor, source: &KernelSource) -> ComputeResult<Self> {
        let kind = match device.class() {
            DeviceClass::Cpu => StrategyKind::Cpu,
            DeviceClass::Gpu => StrategyKind::Gpu,
        };
        Ok(Self {
            kind,
            device: device.name().to_string(),
            program: device.build(source)?,
        })
    }
}

impl ExecutionStrategy for SingleDevice {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn devices(&self) -> Vec<String> {
        vec![self.device.clone()]
    }

    fn run(&self, input: &PixelBuffer) -> ComputeResult<PixelBuffer> {
        let mut output = PixelBuffer::new(input.width(), input.height())?;
        if !input.is_empty() {
            self.program.run(input.pixels(), output.pixels_mut())?;
        }
        Ok(output)
    }
}

// ============================================================================
// SplitDevice
// ============================================================================

/// Leading half of the pixels on a CPU-class device, trailing half on a
/// GPU-class device, both in flight at once.
pub struct SplitDevice {
    cpu_device: String,
    gpu_device: String,
    cpu: Box<dyn DeviceProgram>,
    gpu: Box<dyn DeviceProgram>,
}

impl SplitDevice {
    /// Compiles `source` for both devices. Either build failing fails the strategy.
    pub fn new(
        cpu: &DeviceDescriptor,
        gpu: &DeviceDescriptor,
        source: &KernelSource,
    ) -> ComputeResult<Self> {
        Ok(Self {
            cpu_device: cpu.name().to_string(),
            gpu_device: gpu.name().to_string(),
            cpu: cpu.build(source)?,
            gpu: gpu.build(source)?,
        })
    }
}

impl ExecutionStrategy for SplitDevice {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Split
    }

    fn devices(&self) -> Vec<String> {
        vec![self.cpu_device.clone(), self.gpu_device.clone()]
    }

    fn run(&self, input: &PixelBuffer) -> ComputeResult<PixelBuffer> {
        let mut output = PixelBuffer::new(input.width(), input.height())?;
        let at = split_point(input.len());
        let (cpu_in, gpu_in) = input.pixels().split_at(at);

        // Both launches are submitted before either is awaited.
        let cpu_launch = submit_nonempty(self.cpu.as_ref(), cpu_in)?;
        let gpu_launch = submit_nonempty(self.gpu.as_ref(), gpu_in)?;

        let (cpu_out, gpu_out) = output.pixels_mut().split_at_mut(at);
        let cpu_result = cpu_launch.map_or(Ok(()), |launch| launch.wait_into(cpu_out));
        let gpu_result = gpu_launch.map_or(Ok(()), |launch| launch.wait_into(gpu_out));
        cpu_result?;
        gpu_result?;

        tracing::trace!(cpu_pixels = at, gpu_pixels = input.len() - at, "split complete");
        Ok(output)
    }
}

fn submit_nonempty<'a>(
    program: &'a dyn DeviceProgram,
    pixels: &[Rgb8],
) -> ComputeResult<Option<Box<dyn PendingLaunch + 'a>>> {
    if pixels.is_empty() {
        return Ok(None);
    }
    program.submit(pixels).map(Some)
}

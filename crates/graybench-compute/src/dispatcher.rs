//! Strategy selection and timing.

use std::time::{Duration, Instant};

use graybench_core::PixelBuffer;
use tracing::{debug, info};

use crate::backend::{DeviceCatalog, DeviceClass};
use crate::strategy::{ExecutionStrategy, Reference, SingleDevice, SplitDevice, StrategyKind};
use crate::{ComputeResult, KernelSource};

/// Output and wall-clock time of one strategy run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub kind: StrategyKind,
    /// Devices the strategy ran on.
    pub devices: Vec<String>,
    pub output: PixelBuffer,
    /// Time spent in the transform only. Device selection and kernel
    /// compilation happen before the clock starts.
    pub elapsed: Duration,
}

impl ExecutionResult {
    /// Elapsed time in fractional milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Builds strategies from the catalog's best devices and runs them.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    catalog: &'a DeviceCatalog,
    source: &'a KernelSource,
}

impl<'a> Dispatcher<'a> {
    pub fn new(catalog: &'a DeviceCatalog, source: &'a KernelSource) -> Self {
        Self { catalog, source }
    }

    /// Picks devices and compiles kernels for `kind`.
    ///
    /// Fails with [`crate::ComputeError::MissingDeviceClass`] before any
    /// compilation if a required class has no device.
    pub fn prepare(&self, kind: StrategyKind) -> ComputeResult<Box<dyn ExecutionStrategy>> {
        let strategy: Box<dyn ExecutionStrategy> = match kind {
            StrategyKind::Reference => Box::new(Reference),
            StrategyKind::Cpu => {
                let device = self.catalog.require_best(DeviceClass::Cpu)?;
                Box::new(SingleDevice::new(device, self.source)?)
            }
            StrategyKind::Gpu => {
                let device = self.catalog.require_best(DeviceClass::Gpu)?;
                Box::new(SingleDevice::new(device, self.source)?)
            }
            StrategyKind::Split => {
                let cpu = self.catalog.require_best(DeviceClass::Cpu)?;
                let gpu = self.catalog.require_best(DeviceClass::Gpu)?;
                Box::new(SplitDevice::new(cpu, gpu, self.source)?)
            }
        };
        debug!(strategy = %kind, devices = ?strategy.devices(), "strategy ready");
        Ok(strategy)
    }

    /// Prepares `kind`, then runs it on `input` under the clock.
    pub fn dispatch(
        &self,
        kind: StrategyKind,
        input: &PixelBuffer,
    ) -> ComputeResult<ExecutionResult> {
        let strategy = self.prepare(kind)?;

        let start = Instant::now();
        let output = strategy.run(input)?;
        let elapsed = start.elapsed();

        let result = ExecutionResult {
            kind,
            devices: strategy.devices(),
            output,
            elapsed,
        };
        info!(
            strategy = %kind,
            pixels = input.len(),
            ms = result.elapsed_ms(),
            "transform complete"
        );
        Ok(result)
    }
}

//! Device discovery and ranking.

use std::fmt;
use std::sync::Arc;

use super::{DeviceBackend, DeviceProgram, Platform};
use crate::{ComputeError, ComputeResult, KernelSource};

/// Broad device category a platform reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// General-purpose processors.
    Cpu,
    /// Graphics processors.
    Gpu,
}

impl DeviceClass {
    /// Both classes in catalog order.
    pub const ALL: [DeviceClass; 2] = [DeviceClass::Cpu, DeviceClass::Gpu];

    /// Short label ("CPU" / "GPU").
    pub fn label(self) -> &'static str {
        match self {
            DeviceClass::Cpu => "CPU",
            DeviceClass::Gpu => "GPU",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-class", self.label())
    }
}

/// One discovered device and the handle used to compile for it.
#[derive(Clone)]
pub struct DeviceDescriptor {
    name: String,
    platform: String,
    class: DeviceClass,
    compute_units: u32,
    clock_mhz: u32,
    backend: Arc<dyn DeviceBackend>,
}

impl DeviceDescriptor {
    pub fn new(
        name: impl Into<String>,
        platform: impl Into<String>,
        class: DeviceClass,
        compute_units: u32,
        clock_mhz: u32,
        backend: Arc<dyn DeviceBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            platform: platform.into(),
            class,
            compute_units,
            clock_mhz,
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn compute_units(&self) -> u32 {
        self.compute_units
    }

    pub fn clock_mhz(&self) -> u32 {
        self.clock_mhz
    }

    /// Ranking score: compute units times clock in MHz.
    pub fn score(&self) -> u64 {
        u64::from(self.compute_units) * u64::from(self.clock_mhz)
    }

    /// Compiles `source` for this device.
    pub fn build(&self, source: &KernelSource) -> ComputeResult<Box<dyn DeviceProgram>> {
        tracing::debug!(device = %self.name, platform = %self.platform, "building kernel");
        self.backend.build(source)
    }
}

impl fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("name", &self.name)
            .field("platform", &self.platform)
            .field("class", &self.class)
            .field("compute_units", &self.compute_units)
            .field("clock_mhz", &self.clock_mhz)
            .finish_non_exhaustive()
    }
}

/// All discovered devices, split by class and kept in discovery order.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    cpu: Vec<DeviceDescriptor>,
    gpu: Vec<DeviceDescriptor>,
}

impl DeviceCatalog {
    /// Queries every platform for both classes.
    ///
    /// A platform whose query fails is logged and skipped. An empty catalog is
    /// not an error here; the caller decides whether that is fatal.
    pub fn discover(platforms: &[Box<dyn Platform>]) -> ComputeResult<Self> {
        if platforms.is_empty() {
            return Err(ComputeError::NoPlatform);
        }

        let mut catalog = Self::default();
        for platform in platforms {
            for class in DeviceClass::ALL {
                match platform.devices(class) {
                    Ok(devices) => {
                        tracing::debug!(
                            platform = platform.name(),
                            %class,
                            count = devices.len(),
                            "queried devices"
                        );
                        for device in devices {
                            catalog.push(device);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            platform = platform.name(),
                            %class,
                            "device query failed: {e}"
                        );
                    }
                }
            }
        }
        Ok(catalog)
    }

    /// Builds a catalog from an explicit device list.
    pub fn from_devices(devices: impl IntoIterator<Item = DeviceDescriptor>) -> Self {
        let mut catalog = Self::default();
        for device in devices {
            catalog.push(device);
        }
        catalog
    }

    /// Appends a device to the list of its class.
    pub fn push(&mut self, device: DeviceDescriptor) {
        match device.class() {
            DeviceClass::Cpu => self.cpu.push(device),
            DeviceClass::Gpu => self.gpu.push(device),
        }
    }

    pub fn devices(&self, class: DeviceClass) -> &[DeviceDescriptor] {
        match class {
            DeviceClass::Cpu => &self.cpu,
            DeviceClass::Gpu => &self.gpu,
        }
    }

    pub fn cpu_devices(&self) -> &[DeviceDescriptor] {
        &self.cpu
    }

    pub fn gpu_devices(&self) -> &[DeviceDescriptor] {
        &self.gpu
    }

    /// True when neither class has a device.
    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty() && self.gpu.is_empty()
    }

    /// Highest-scoring device of `class`, first discovered on ties.
    pub fn best(&self, class: DeviceClass) -> Option<&DeviceDescriptor> {
        pick_best(self.devices(class))
    }

    /// Like [`best`](Self::best) but fails with [`ComputeError::MissingDeviceClass`].
    pub fn require_best(&self, class: DeviceClass) -> ComputeResult<&DeviceDescriptor> {
        self.best(class)
            .ok_or(ComputeError::MissingDeviceClass(class))
    }
}

/// Sorts by descending score. The sort is stable, so ties keep discovery order.
pub fn rank(devices: &mut [DeviceDescriptor]) {
    devices.sort_by(|a, b| b.score().cmp(&a.score()));
}

/// First device with the maximum score.
pub fn pick_best(devices: &[DeviceDescriptor]) -> Option<&DeviceDescriptor> {
    let mut best: Option<&DeviceDescriptor> = None;
    for device in devices {
        match best {
            Some(current) if current.score() >= device.score() => {}
            _ => best = Some(device),
        }
    }
    best
}

/// Human-readable summary of the catalog.
pub fn describe_devices(catalog: &DeviceCatalog) -> String {
    let mut desc = String::new();

    for class in DeviceClass::ALL {
        let devices = catalog.devices(class);
        desc.push_str(&format!("{} {class} device(s) found\n", devices.len()));
        for device in devices {
            desc.push_str(&format!(
                "  [{}] {} ({} units @ {} MHz)\n",
                device.platform(),
                device.name(),
                device.compute_units(),
                device.clock_mhz()
            ));
        }
    }

    for class in DeviceClass::ALL {
        if let Some(best) = catalog.best(class) {
            desc.push_str(&format!("Best {class} device: {}\n", best.name()));
        }
    }

    desc
}

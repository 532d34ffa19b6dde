//! Strategy parity tests on the host platform.

use std::sync::{Arc, Mutex};

use graybench_compute::{
    ComputeError, ComputeResult, DeviceBackend, DeviceCatalog, DeviceClass, DeviceDescriptor,
    DeviceProgram, Dispatcher, ExecutionStrategy, HostDevice, KernelSource, PendingLaunch,
    SingleDevice, SplitDevice, StrategyKind, split_point,
};
use graybench_core::{PixelBuffer, Rgb8, grayscale, grayscale_into};

fn host(name: &str, class: DeviceClass) -> DeviceDescriptor {
    DeviceDescriptor::new(name, "Host", class, 2, 1000, Arc::new(HostDevice::new(name, 2)))
}

fn full_catalog() -> DeviceCatalog {
    DeviceCatalog::from_devices([host("cpu", DeviceClass::Cpu), host("gpu", DeviceClass::Gpu)])
}

/// Deterministic pseudo-random image.
fn noise(width: u32, height: u32) -> PixelBuffer {
    let mut state = 0x2545_f491_u32;
    let pixels = (0..width * height)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgb8::new(r, g, b)
        })
        .collect();
    PixelBuffer::from_pixels(pixels, width, height).unwrap()
}

#[test]
fn test_all_strategies_match_reference() {
    let catalog = full_catalog();
    let source = KernelSource::builtin();
    let dispatcher = Dispatcher::new(&catalog, &source);
    let input = noise(37, 23);

    let reference = dispatcher.dispatch(StrategyKind::Reference, &input).unwrap();
    for kind in StrategyKind::ALL {
        let result = dispatcher.dispatch(kind, &input).unwrap();
        assert_eq!(result.kind, kind);
        assert_eq!(result.output.len(), input.len(), "{kind}");
        assert_eq!(result.output.width(), input.width());
        assert_eq!(result.output.height(), input.height());
        assert_eq!(result.output, reference.output, "{kind} differs from reference");
    }
}

#[test]
fn test_known_pixel_every_strategy() {
    let catalog = full_catalog();
    let source = KernelSource::builtin();
    let dispatcher = Dispatcher::new(&catalog, &source);
    let input = PixelBuffer::from_pixels(vec![Rgb8::new(200, 100, 50); 4], 2, 2).unwrap();

    for kind in StrategyKind::ALL {
        let result = dispatcher.dispatch(kind, &input).unwrap();
        assert!(result.output.pixels().iter().all(|&px| px == Rgb8::splat(125)), "{kind}");
    }
}

#[test]
fn test_output_is_a_fixed_point() {
    let catalog = full_catalog();
    let source = KernelSource::builtin();
    let dispatcher = Dispatcher::new(&catalog, &source);
    let once = dispatcher.dispatch(StrategyKind::Split, &noise(16, 9)).unwrap().output;
    let twice = dispatcher.dispatch(StrategyKind::Split, &once).unwrap().output;
    assert_eq!(once, twice);
}

#[test]
fn test_repeated_runs_are_identical() {
    let catalog = full_catalog();
    let source = KernelSource::builtin();
    let dispatcher = Dispatcher::new(&catalog, &source);
    let input = noise(29, 17);

    for kind in StrategyKind::ALL {
        let first = dispatcher.dispatch(kind, &input).unwrap().output;
        let second = dispatcher.dispatch(kind, &input).unwrap().output;
        assert_eq!(first, second, "{kind}");
    }
}

#[test]
fn test_split_halves_match_single_device() {
    let cpu = host("cpu", DeviceClass::Cpu);
    let gpu = host("gpu", DeviceClass::Gpu);
    let source = KernelSource::builtin();
    let input = noise(11, 3);
    let at = split_point(input.len());

    let split = SplitDevice::new(&cpu, &gpu, &source).unwrap().run(&input).unwrap();
    let on_cpu = SingleDevice::new(&cpu, &source).unwrap();
    let on_gpu = SingleDevice::new(&gpu, &source).unwrap();

    let slice = |range: &[Rgb8]| {
        PixelBuffer::from_pixels(range.to_vec(), range.len() as u32, 1).unwrap()
    };
    let head = on_cpu.run(&slice(&input.pixels()[..at])).unwrap();
    let tail = on_gpu.run(&slice(&input.pixels()[at..])).unwrap();
    assert_eq!(&split.pixels()[..at], head.pixels());
    assert_eq!(&split.pixels()[at..], tail.pixels());

    let expected: Vec<Rgb8> = input.pixels().iter().map(|&p| grayscale(p)).collect();
    assert_eq!(split.pixels(), expected.as_slice());
}

#[test]
fn test_empty_and_single_pixel_images() {
    let catalog = full_catalog();
    let source = KernelSource::builtin();
    let dispatcher = Dispatcher::new(&catalog, &source);

    let empty = PixelBuffer::new(0, 0).unwrap();
    let one = PixelBuffer::from_pixels(vec![Rgb8::new(9, 3, 1)], 1, 1).unwrap();
    for kind in StrategyKind::ALL {
        assert!(dispatcher.dispatch(kind, &empty).unwrap().output.is_empty());
        let out = dispatcher.dispatch(kind, &one).unwrap().output;
        assert_eq!(out.pixels(), &[Rgb8::splat(5)], "{kind}");
    }
}

#[test]
fn test_missing_cpu_class() {
    let catalog = DeviceCatalog::from_devices([host("gpu", DeviceClass::Gpu)]);
    let source = KernelSource::builtin();
    let dispatcher = Dispatcher::new(&catalog, &source);
    let input = noise(4, 4);

    for kind in [StrategyKind::Cpu, StrategyKind::Split] {
        match dispatcher.dispatch(kind, &input) {
            Err(ComputeError::MissingDeviceClass(DeviceClass::Cpu)) => {}
            other => panic!("{kind}: expected MissingDeviceClass, got {:?}", other.map(|r| r.kind)),
        }
    }
    // the remaining strategies still work
    assert!(dispatcher.dispatch(StrategyKind::Gpu, &input).is_ok());
    assert!(dispatcher.dispatch(StrategyKind::Reference, &input).is_ok());
}

#[test]
fn test_bad_kernel_reports_build_error() {
    let catalog = full_catalog();
    let source = KernelSource::new("__kernel void sepia(__global uchar* p) {}", "");
    let dispatcher = Dispatcher::new(&catalog, &source);

    for kind in [StrategyKind::Cpu, StrategyKind::Gpu, StrategyKind::Split] {
        let err = dispatcher.dispatch(kind, &noise(2, 2)).unwrap_err();
        assert!(matches!(err, ComputeError::KernelBuild { .. }), "{kind}: {err}");
    }
    assert!(dispatcher.dispatch(StrategyKind::Reference, &noise(2, 2)).is_ok());
}

// ---------------------------------------------------------------------------
// A device whose launches always fail.
// ---------------------------------------------------------------------------

struct BrokenDevice;
struct BrokenProgram;
struct BrokenLaunch;

fn broken_backend() -> Arc<BrokenDevice> {
    Arc::new(BrokenDevice)
}

impl DeviceBackend for BrokenDevice {
    fn build(&self, _source: &KernelSource) -> ComputeResult<Box<dyn DeviceProgram>> {
        Ok(Box::new(BrokenProgram))
    }
}

impl DeviceProgram for BrokenProgram {
    fn submit<'a>(&'a self, _input: &[Rgb8]) -> ComputeResult<Box<dyn PendingLaunch + 'a>> {
        Ok(Box::new(BrokenLaunch))
    }
}

impl PendingLaunch for BrokenLaunch {
    fn wait_into(self: Box<Self>, _output: &mut [Rgb8]) -> ComputeResult<()> {
        Err(ComputeError::Execution {
            device: "broken".into(),
            message: "device lost".into(),
        })
    }
}

#[test]
fn test_split_fails_when_one_half_fails() {
    let broken = DeviceDescriptor::new("broken", "Test", DeviceClass::Gpu, 1, 1, broken_backend());
    let catalog = DeviceCatalog::from_devices([host("cpu", DeviceClass::Cpu), broken]);
    let source = KernelSource::builtin();
    let dispatcher = Dispatcher::new(&catalog, &source);

    let err = dispatcher.dispatch(StrategyKind::Split, &noise(8, 8)).unwrap_err();
    assert!(matches!(err, ComputeError::Execution { .. }));
    assert!(dispatcher.dispatch(StrategyKind::Cpu, &noise(8, 8)).is_ok());
}

#[test]
fn test_single_pixel_split_skips_cpu_launch() {
    // The CPU share of a one-pixel image is empty, so a broken CPU device is never awaited.
    let broken = DeviceDescriptor::new("broken", "Test", DeviceClass::Cpu, 1, 1, broken_backend());
    let catalog = DeviceCatalog::from_devices([broken, host("gpu", DeviceClass::Gpu)]);
    let source = KernelSource::builtin();
    let dispatcher = Dispatcher::new(&catalog, &source);

    let one = PixelBuffer::from_pixels(vec![Rgb8::new(200, 100, 50)], 1, 1).unwrap();
    let result = dispatcher.dispatch(StrategyKind::Split, &one).unwrap();
    assert_eq!(result.output.pixels(), &[Rgb8::splat(125)]);
    assert_eq!(result.devices, ["broken", "gpu"]);
}

// ---------------------------------------------------------------------------
// A device that logs every submit and wait.
// ---------------------------------------------------------------------------

type Events = Arc<Mutex<Vec<String>>>;

struct RecordingDevice {
    label: &'static str,
    events: Events,
}

struct RecordingProgram {
    label: &'static str,
    events: Events,
}

struct RecordingLaunch<'a> {
    program: &'a RecordingProgram,
    input: Vec<Rgb8>,
}

impl RecordingProgram {
    fn log(&self, event: &str) {
        self.events.lock().unwrap().push(format!("{event} {}", self.label));
    }
}

impl DeviceBackend for RecordingDevice {
    fn build(&self, _source: &KernelSource) -> ComputeResult<Box<dyn DeviceProgram>> {
        Ok(Box::new(RecordingProgram {
            label: self.label,
            events: Arc::clone(&self.events),
        }))
    }
}

impl DeviceProgram for RecordingProgram {
    fn submit<'a>(&'a self, input: &[Rgb8]) -> ComputeResult<Box<dyn PendingLaunch + 'a>> {
        self.log("submit");
        Ok(Box::new(RecordingLaunch {
            program: self,
            input: input.to_vec(),
        }))
    }
}

impl PendingLaunch for RecordingLaunch<'_> {
    fn wait_into(self: Box<Self>, output: &mut [Rgb8]) -> ComputeResult<()> {
        self.program.log("wait");
        grayscale_into(&self.input, output);
        Ok(())
    }
}

fn recording(label: &'static str, class: DeviceClass, events: &Events) -> DeviceDescriptor {
    let backend = Arc::new(RecordingDevice {
        label,
        events: Arc::clone(events),
    });
    DeviceDescriptor::new(label, "Test", class, 1, 1, backend)
}

#[test]
fn test_split_submits_both_before_waiting() {
    let events = Events::default();
    let cpu = recording("cpu", DeviceClass::Cpu, &events);
    let gpu = recording("gpu", DeviceClass::Gpu, &events);
    let input = noise(9, 5);

    let split = SplitDevice::new(&cpu, &gpu, &KernelSource::builtin()).unwrap();
    let output = split.run(&input).unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        ["submit cpu", "submit gpu", "wait cpu", "wait gpu"]
    );
    let expected: Vec<Rgb8> = input.pixels().iter().map(|&p| grayscale(p)).collect();
    assert_eq!(output.pixels(), expected.as_slice());
}

// ---------------------------------------------------------------------------
// Accelerator kernels against the reference loop. Skipped without hardware.
// ---------------------------------------------------------------------------

#[cfg(any(feature = "opencl", feature = "wgpu"))]
fn assert_platforms_match_reference(platforms: Vec<Box<dyn graybench_compute::Platform>>) {
    use graybench_compute::Reference;

    if platforms.is_empty() {
        eprintln!("no platform found, skipping");
        return;
    }
    let catalog = DeviceCatalog::discover(&platforms).unwrap();
    let source = KernelSource::builtin();

    // odd sizes exercise partial workgroups and padded buffers
    for input in [noise(37, 23), noise(1, 1), noise(5, 3)] {
        let expected = Reference.run(&input).unwrap();
        for device in catalog.cpu_devices().iter().chain(catalog.gpu_devices()) {
            let strategy = SingleDevice::new(device, &source)
                .unwrap_or_else(|e| panic!("{}: {e}", device.name()));
            let output = strategy.run(&input).unwrap();
            assert_eq!(output, expected, "{} on {}", device.name(), device.platform());
        }
    }
}

#[cfg(feature = "opencl")]
#[test]
fn test_opencl_devices_match_reference() {
    let platforms = graybench_compute::backend::OpenClPlatform::enumerate()
        .into_iter()
        .map(|p| Box::new(p) as Box<dyn graybench_compute::Platform>)
        .collect();
    assert_platforms_match_reference(platforms);
}

#[cfg(feature = "wgpu")]
#[test]
fn test_wgpu_devices_match_reference() {
    let platforms = graybench_compute::backend::WgpuPlatform::enumerate()
        .into_iter()
        .map(|p| Box::new(p) as Box<dyn graybench_compute::Platform>)
        .collect();
    assert_platforms_match_reference(platforms);
}

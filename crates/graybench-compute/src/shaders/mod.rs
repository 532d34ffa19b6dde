//! Kernel sources for the device programs.
//!
//! The built-in sources are compiled into the binary. A kernel directory can
//! replace them at startup; it must contain `grayscale.cl` and
//! `grayscale.wgsl`.

use std::fs;
use std::path::Path;

use crate::{ComputeError, ComputeResult};

/// Entry point every kernel source must export.
pub const DEFAULT_ENTRY_POINT: &str = "grayscale";

/// OpenCL C file name inside a kernel directory.
pub const OPENCL_FILE: &str = "grayscale.cl";
/// WGSL file name inside a kernel directory.
pub const WGSL_FILE: &str = "grayscale.wgsl";

const BUILTIN_OPENCL: &str = include_str!("grayscale.cl");
const BUILTIN_WGSL: &str = include_str!("grayscale.wgsl");

/// Grayscale kernel text for each device language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    entry_point: String,
    opencl: String,
    wgsl: String,
}

impl KernelSource {
    /// Kernels shipped with the crate.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_OPENCL, BUILTIN_WGSL)
    }

    /// Loads `grayscale.cl` and `grayscale.wgsl` from `dir`.
    ///
    /// # Errors
    ///
    /// [`ComputeError::KernelSource`] naming the first file that could not be read.
    pub fn from_dir(dir: impl AsRef<Path>) -> ComputeResult<Self> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| ComputeError::KernelSource { path, source })
        };
        let opencl = read(OPENCL_FILE)?;
        let wgsl = read(WGSL_FILE)?;
        tracing::debug!(dir = %dir.display(), "loaded kernel sources");
        Ok(Self::new(opencl, wgsl))
    }

    pub fn new(opencl: impl Into<String>, wgsl: impl Into<String>) -> Self {
        Self {
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            opencl: opencl.into(),
            wgsl: wgsl.into(),
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// OpenCL C text.
    pub fn opencl(&self) -> &str {
        &self.opencl
    }

    /// WGSL text.
    pub fn wgsl(&self) -> &str {
        &self.wgsl
    }

    /// True if both texts are the ones shipped with the crate.
    pub fn is_builtin(&self) -> bool {
        self.opencl == BUILTIN_OPENCL && self.wgsl == BUILTIN_WGSL
    }

    /// True if the OpenCL text declares `__kernel void <entry_point>`.
    ///
    /// The host devices run the transform natively, so this token scan is
    /// the whole of their "compilation".
    pub fn declares_opencl_kernel(&self) -> bool {
        let tokens: Vec<&str> = self
            .opencl
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .filter(|t| !t.is_empty())
            .collect();
        tokens.windows(3).any(|w| {
            matches!(w[0], "__kernel" | "kernel") && w[1] == "void" && w[2] == self.entry_point
        })
    }
}

impl Default for KernelSource {
    fn default() -> Self {
        Self::builtin()
    }
}

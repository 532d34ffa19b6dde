//! Platform selection.
//!
//! # Environment Variables
//!
//! - `GRAYBENCH_HOST` - Query the in-process host platform ("1" or "true")
//! - `GRAYBENCH_NO_HOST` - Skip the in-process host platform ("1" or "true")
//! - `GRAYBENCH_EMULATE_GPU` - Expose a host-backed GPU-class device ("1" or "true")
//! - `GRAYBENCH_HOST_THREADS` - Worker threads per host device (0 = all CPUs)
//!
//! The host platform is on by default only in builds without an accelerator
//! platform. With `opencl` or `wgpu` compiled in it has to be requested.

use std::env;

pub const ENV_HOST: &str = "GRAYBENCH_HOST";
pub const ENV_NO_HOST: &str = "GRAYBENCH_NO_HOST";
pub const ENV_EMULATE_GPU: &str = "GRAYBENCH_EMULATE_GPU";
pub const ENV_HOST_THREADS: &str = "GRAYBENCH_HOST_THREADS";

/// True when an OpenCL or wgpu platform is compiled in.
pub const HAS_ACCELERATORS: bool = cfg!(any(feature = "opencl", feature = "wgpu"));

/// Which platforms device discovery queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Query the in-process host platform.
    pub host: bool,
    /// Add a host-backed device classified as GPU-class. Implies `host`.
    pub emulate_gpu: bool,
    /// Worker threads per host device (0 = all logical CPUs).
    pub host_threads: usize,
    /// Query OpenCL platforms (needs the `opencl` feature).
    pub opencl: bool,
    /// Query wgpu backends (needs the `wgpu` feature).
    pub wgpu: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            host: !HAS_ACCELERATORS,
            emulate_gpu: false,
            host_threads: 0,
            opencl: true,
            wgpu: true,
        }
    }
}

impl PlatformConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(ENV_HOST).is_some_and(|v| is_truthy(&v)) {
            self.host = true;
        }
        if lookup(ENV_NO_HOST).is_some_and(|v| is_truthy(&v)) {
            self.host = false;
        }
        if lookup(ENV_EMULATE_GPU).is_some_and(|v| is_truthy(&v)) {
            self.emulate_gpu = true;
        }
        if let Some(threads) = lookup(ENV_HOST_THREADS).and_then(|v| v.trim().parse().ok()) {
            self.host_threads = threads;
        }
        self
    }

    /// Whether discovery includes the host platform.
    pub fn host_enabled(&self) -> bool {
        self.host || self.emulate_gpu
    }

    /// Host worker thread count with `0` resolved to the logical CPU count.
    pub fn effective_host_threads(&self) -> usize {
        if self.host_threads > 0 {
            return self.host_threads;
        }
        sys_info::cpu_num()
            .map(|n| n as usize)
            .unwrap_or_else(|_| rayon::current_num_threads())
            .max(1)
    }
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::default();
        assert_eq!(config.host, !HAS_ACCELERATORS);
        assert!(!config.emulate_gpu);
        assert_eq!(config.host_threads, 0);
    }

    #[test]
    fn test_env_overrides() {
        let config = PlatformConfig::default().with_env(lookup(&[
            (ENV_NO_HOST, "true"),
            (ENV_EMULATE_GPU, "1"),
            (ENV_HOST_THREADS, " 3 "),
        ]));
        assert!(!config.host);
        assert!(config.emulate_gpu);
        assert_eq!(config.host_threads, 3);
        assert_eq!(config.effective_host_threads(), 3);
    }

    #[test]
    fn test_host_opt_in() {
        let config = PlatformConfig {
            host: false,
            ..Default::default()
        };
        assert!(!config.host_enabled());
        assert!(config.clone().with_env(lookup(&[(ENV_HOST, "1")])).host_enabled());
        assert!(config.with_env(lookup(&[(ENV_EMULATE_GPU, "1")])).host_enabled());

        // an explicit opt-out beats an opt-in
        let config = PlatformConfig::default()
            .with_env(lookup(&[(ENV_HOST, "1"), (ENV_NO_HOST, "1")]));
        assert!(!config.host);
    }

    #[test]
    fn test_env_ignores_garbage() {
        let config = PlatformConfig::default().with_env(lookup(&[
            (ENV_NO_HOST, "no"),
            (ENV_HOST_THREADS, "many"),
        ]));
        assert_eq!(config, PlatformConfig::default());
    }

    #[test]
    fn test_auto_threads_nonzero() {
        assert!(PlatformConfig::default().effective_host_threads() >= 1);
    }
}

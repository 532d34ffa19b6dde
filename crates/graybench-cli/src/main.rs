//! graybench - grayscale benchmark across CPU and GPU devices
//!
//! Decodes one JPEG, discovers compute devices, then runs the grayscale
//! transform with the strategy picked from a numeric menu and writes the
//! result.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use graybench_compute::{
    ComputeError, DeviceCatalog, Dispatcher, KernelSource, PlatformConfig, describe_devices,
    enumerate_platforms,
};
use graybench_io::{JpegWriter, JpegWriterOptions};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod menu;
mod session;

use menu::MenuChoice;
use session::Session;

/// Exit status for startup failures.
const EXIT_FAILURE: i32 = -1;

#[derive(Parser)]
#[command(name = "graybench")]
#[command(author, version, about = "Grayscale benchmark across CPU and GPU devices")]
#[command(long_about = "
Converts a JPEG to grayscale with one of four strategies and reports the time
spent in the transform.

Menu:
  0  Exit
  1  Serial (host thread)
  2  Best CPU-class device
  3  Best GPU-class device
  4  CPU + GPU, half the pixels each

Examples:
  graybench photo.jpg                      # Interactive menu
  graybench photo.jpg -s 1 -s 4            # Run Serial, then CPU + GPU, then exit
  graybench photo.jpg --emulate-gpu -s 3   # GPU strategy on a host-emulated GPU
  graybench photo.jpg -o gray.jpg -q 95 -vv
")]
struct Cli {
    /// Input JPEG
    input: PathBuf,

    /// Output JPEG
    #[arg(short, long, default_value = "out.jpg")]
    output: PathBuf,

    /// JPEG quality (1-100)
    #[arg(short, long, default_value_t = 75, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Load grayscale.cl / grayscale.wgsl from this directory
    #[arg(long, value_name = "DIR")]
    kernels: Option<PathBuf>,

    /// Expose the in-process host devices (default only without OpenCL/wgpu)
    #[arg(long, conflicts_with = "no_host")]
    host: bool,

    /// Do not expose the in-process host devices
    #[arg(long)]
    no_host: bool,

    /// Expose a host-backed GPU-class device (implies --host)
    #[arg(long)]
    emulate_gpu: bool,

    /// Worker threads per host device (0 = auto)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,

    /// Run these menu choices in order, then exit
    #[arg(short, long = "select", value_name = "N")]
    select: Vec<i64>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_FAILURE } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let code = {
        // The guard flushes the log file when dropped, so it must go before exit.
        match init_logging(cli.verbose, cli.log.as_deref()) {
            Ok(_guard) => match run(&cli) {
                Ok(()) => 0,
                Err(e) => {
                    tracing::error!("{e:#}");
                    eprintln!("Error: {e:#}");
                    EXIT_FAILURE
                }
            },
            Err(e) => {
                eprintln!("Error: {e:#}");
                EXIT_FAILURE
            }
        }
    };
    process::exit(code);
}

/// Installs the stderr subscriber and, with `--log`, a file writer.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install logger")?;
    Ok(guard)
}

fn platform_config(cli: &Cli) -> PlatformConfig {
    let mut config = PlatformConfig::from_env();
    if cli.host {
        config.host = true;
    }
    if cli.no_host {
        config.host = false;
    }
    if cli.emulate_gpu {
        config.emulate_gpu = true;
    }
    if cli.threads > 0 {
        config.host_threads = cli.threads;
    }
    config
}

fn run(cli: &Cli) -> Result<()> {
    let image = graybench_io::read(&cli.input)
        .with_context(|| format!("Invalid image file {}", cli.input.display()))?;
    println!("Image reading completed.");
    tracing::info!(width = image.width(), height = image.height(), "decoded input");

    let platforms = enumerate_platforms(&platform_config(cli));
    let catalog = DeviceCatalog::discover(&platforms).context("No valid compute platform")?;
    if catalog.is_empty() {
        return Err(anyhow::Error::new(ComputeError::NoDevice).context("No valid compute device"));
    }
    print!("{}", describe_devices(&catalog));

    let kernels = match &cli.kernels {
        Some(dir) => KernelSource::from_dir(dir)?,
        None => KernelSource::builtin(),
    };

    let writer = JpegWriter::with_options(JpegWriterOptions {
        quality: cli.quality,
    });
    let session = Session::new(
        Dispatcher::new(&catalog, &kernels),
        &image,
        cli.output.clone(),
        writer,
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !cli.select.is_empty() {
        for &index in &cli.select {
            match MenuChoice::from_index(index) {
                MenuChoice::Exit => break,
                MenuChoice::Run(kind) => session.run_and_report(kind, &mut out)?,
            }
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        match menu::read_choice(&mut input, &mut out)? {
            MenuChoice::Exit => {
                writeln!(out, "Bye.")?;
                return Ok(());
            }
            MenuChoice::Run(kind) => session.run_and_report(kind, &mut out)?,
        }
    }
}

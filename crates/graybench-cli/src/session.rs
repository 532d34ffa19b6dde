//! One benchmark session: a decoded image, a dispatcher and an output path.

use std::io::{self, Write};
use std::path::PathBuf;

use graybench_compute::{ComputeError, Dispatcher, ExecutionResult, StrategyKind};
use graybench_core::PixelBuffer;
use graybench_io::{IoError, JpegWriter};

/// What happened to one menu selection.
#[derive(Debug)]
pub enum Outcome {
    /// Transform succeeded and the output was written.
    Saved(ExecutionResult),
    /// Transform succeeded but writing the output failed.
    NotSaved(ExecutionResult, IoError),
    /// Transform failed; nothing was written.
    Failed(ComputeError),
}

pub struct Session<'a> {
    dispatcher: Dispatcher<'a>,
    image: &'a PixelBuffer,
    output: PathBuf,
    writer: JpegWriter,
}

impl<'a> Session<'a> {
    pub fn new(
        dispatcher: Dispatcher<'a>,
        image: &'a PixelBuffer,
        output: PathBuf,
        writer: JpegWriter,
    ) -> Self {
        Self {
            dispatcher,
            image,
            output,
            writer,
        }
    }

    /// Runs `kind` and writes its output.
    pub fn execute(&self, kind: StrategyKind) -> Outcome {
        let result = match self.dispatcher.dispatch(kind, self.image) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(strategy = %kind, "transform failed: {e}");
                return Outcome::Failed(e);
            }
        };
        match self.writer.write(&self.output, &result.output) {
            Ok(()) => Outcome::Saved(result),
            Err(e) => {
                tracing::warn!(path = %self.output.display(), "write failed: {e}");
                Outcome::NotSaved(result, e)
            }
        }
    }

    /// Runs `kind` and reports the outcome to `out`.
    pub fn run_and_report<W: Write>(&self, kind: StrategyKind, out: &mut W) -> io::Result<()> {
        match self.execute(kind) {
            Outcome::Saved(result) => {
                writeln!(out)?;
                writeln!(out, "{} elapsed time: {:.3} ms", kind, result.elapsed_ms())?;
                writeln!(out, "Image saved.")?;
            }
            Outcome::NotSaved(result, e) => {
                writeln!(out)?;
                writeln!(out, "{} elapsed time: {:.3} ms", kind, result.elapsed_ms())?;
                writeln!(out, "Could not save {}: {e}", self.output.display())?;
            }
            Outcome::Failed(e) => {
                writeln!(out)?;
                writeln!(out, "{kind} failed: {e}")?;
            }
        }
        Ok(())
    }
}

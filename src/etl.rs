pub mod parse_osm;
pub mod render_map;

use std::path::Path;
use std::time::Instant;

use log::{error, info};

use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Extract,
    Transform,
    Load,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Extract => "extract",
            Phase::Transform => "transform",
            Phase::Load => "load",
        }
    }
}

/// Logs a failed phase and passes the result on.
fn report<T>(etl_name: &str, phase: Phase, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        error!(
            etl_name = etl_name,
            phase = phase.as_str(),
            kind = err.kind.as_str(),
            err = err.message.as_str();
            "Stage failed"
        );
    }
    result
}

/// One cached pipeline stage. Each stage reads what the previous one left in
/// the working directory and writes its own output file there.
pub trait Etl {
    type Input;
    type Output;

    fn etl_name(&self) -> &str;

    fn is_cached(&self, dir: &Path) -> Result<bool>;
    fn clean(&self, dir: &Path) -> Result<()>;

    fn extract(&mut self, dir: &Path) -> Result<Self::Input>;
    fn transform(&mut self, input: Self::Input) -> Result<Self::Output>;
    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()>;

    /// Runs the stage unless its output is already in `dir`.
    fn process(&mut self, dir: &Path) -> Result<()> {
        if self.is_cached(dir)? {
            info!(etl_name = self.etl_name(); "Using cached output");
            return Ok(());
        }

        let started = Instant::now();
        info!(etl_name = self.etl_name(); "Starting stage");
        let input = self.extract(dir);
        let input = report(self.etl_name(), Phase::Extract, input)?;
        let output = self.transform(input);
        let output = report(self.etl_name(), Phase::Transform, output)?;
        let loaded = self.load(dir, output);
        report(self.etl_name(), Phase::Load, loaded)?;
        info!(
            etl_name = self.etl_name(),
            elapsed_ms = started.elapsed().as_millis() as u64;
            "Stage finished"
        );
        Ok(())
    }

    /// Drops any cached output, then runs the stage.
    fn rebuild(&mut self, dir: &Path) -> Result<()> {
        if self.is_cached(dir)? {
            self.clean(dir)?;
        }
        self.process(dir)
    }
}

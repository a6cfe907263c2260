//! Run command - analyze and execute Titan source files

use super::{Outcome, Session};
use anyhow::Result;
use std::path::PathBuf;
use titan_runtime::RunOptions;

/// Run each file as its own unit, in order
///
/// Stops at the first file that reports diagnostics.
pub fn run(files: &[PathBuf], session: &Session) -> Result<Outcome> {
    for file in files {
        let span = tracing::info_span!("unit", file = %file.display());
        let _enter = span.enter();

        let mut titan = session
            .runtime(RunOptions::batch(session.analyze, session.execute))
            .with_root_space(&file.display().to_string());

        match titan.run_file(file) {
            Ok(result) => {
                tracing::debug!(?result, "unit finished");
            }
            Err(diagnostics) => {
                session.report(diagnostics, None);
                return Ok(Outcome::Failed);
            }
        }
    }
    Ok(Outcome::Success)
}

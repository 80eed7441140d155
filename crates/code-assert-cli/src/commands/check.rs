//! Check command implementation.

use anyhow::{Context, Result};
use code_assert_core::{AnalysisResult, Analyzer, AnalyzerError, FindingKind};
use std::path::PathBuf;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Runs the check command.
pub fn run(
    paths: &[PathBuf],
    format: OutputFormat,
    no_cycles: bool,
    fail_on_unused: bool,
    source: &ConfigSource,
) -> Result<()> {
    let config = source.load()?;

    let mut builder = Analyzer::builder()
        .config(config)
        .inputs(paths.iter().cloned());
    if no_cycles {
        builder = builder.cycles(false);
    }
    let analyzer = builder.build().map_err(report)?;

    let result = analyzer.analyze().map_err(report)?;

    super::output::print(&result, format).context("Failed to write results")?;

    if result.has_errors() || (fail_on_unused && has_unused(&result)) {
        std::process::exit(1);
    }

    Ok(())
}

fn has_unused(result: &AnalysisResult) -> bool {
    !result.by_kind(FindingKind::UnusedRule).is_empty()
        || !result.by_kind(FindingKind::UnusedException).is_empty()
}

/// Renders the error with its diagnostic code and help before bailing out.
fn report(err: AnalyzerError) -> anyhow::Error {
    eprintln!("{:?}", miette::Report::new(err));
    anyhow::anyhow!("Analysis failed")
}

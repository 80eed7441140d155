//! Model command: prints packages, sizes and uses.

use anyhow::{bail, Context, Result};
use code_assert_core::model::{ModelBuilder, PackageSummary, SkippedEntry};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;

use crate::config_resolver::ConfigSource;
use crate::ModelFormat;

#[derive(Serialize)]
struct ModelReport {
    packages: Vec<PackageSummary>,
    skipped: Vec<SkippedEntry>,
}

/// Runs the model command.
pub fn run(paths: &[PathBuf], format: ModelFormat, source: &ConfigSource) -> Result<()> {
    let settings = source.load()?.model;
    let inputs = if paths.is_empty() {
        settings.inputs
    } else {
        paths.to_vec()
    };
    if inputs.is_empty() {
        bail!("No inputs: pass paths or set model.inputs in code-assert.toml");
    }

    let mut builder = ModelBuilder::new()
        .inputs(inputs)
        .ignoring_packages(settings.ignore_packages)
        .merging_packages(settings.merge_packages)
        .languages(settings.languages);
    if let Some(threads) = settings.parallelism {
        builder = builder.parallelism(threads);
    }
    let outcome = builder.build().context("Failed to build model")?;

    let report = ModelReport {
        packages: outcome.model.package_summaries(),
        skipped: outcome.skipped,
    };
    match format {
        ModelFormat::Text => print!("{}", render_text(&report)),
        ModelFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn render_text(report: &ModelReport) -> String {
    let mut out = String::new();
    for package in &report.packages {
        let marker = if package.analyzed { "" } else { " (external)" };
        let _ = write!(
            out,
            "{}{}: {} classes, {} bytes code, {} bytes total",
            package.name,
            marker,
            package.sizes.classes,
            package.sizes.code_size,
            package.sizes.total_size
        );
        if let Some(lines) = package.sizes.lines {
            let _ = write!(
                out,
                ", {} code / {} comment / {} blank lines",
                lines.code, lines.comment, lines.blank
            );
        }
        out.push('\n');
        for used in &package.uses {
            let _ = writeln!(out, "  -> {used}");
        }
    }
    for skipped in &report.skipped {
        let _ = writeln!(out, "skipped {}: {}", skipped.location, skipped.reason);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_assert_core::extract::ExtractedClass;
    use code_assert_core::Model;

    #[test]
    fn text_lists_uses_and_external_packages() {
        let model = Model::from_extracted([
            ExtractedClass::new("com.acme.App").with_reference("org.lib.Helper", 1)
        ]);
        let report = ModelReport {
            packages: model.package_summaries(),
            skipped: vec![SkippedEntry {
                location: "app.jar!/Bad.class".to_string(),
                reason: "truncated".to_string(),
            }],
        };
        assert_eq!(
            render_text(&report),
            "com.acme: 1 classes, 0 bytes code, 0 bytes total\n  -> org.lib\n\
             org.lib (external): 0 classes, 0 bytes code, 0 bytes total\n\
             skipped app.jar!/Bad.class: truncated\n"
        );
    }
}

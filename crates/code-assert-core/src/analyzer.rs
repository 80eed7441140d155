//! Analyzer wiring the model build, rule evaluation, cycle detection and
//! ignore list into one run.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;
use tracing::info;

use crate::config::{AnalysisConfig, ConfigError, CycleSettings};
use crate::cycles::{Cycle, CycleDetector, CycleReport};
use crate::ignore::IgnoreFilter;
use crate::model::{BuildError, BuildOutcome, Model, ModelBuilder};
use crate::rules::{RuleSet, RuleSetError};
use crate::types::{AnalysisResult, Finding};

/// Errors that can occur during analysis.
#[derive(Debug, Error, Diagnostic)]
pub enum AnalyzerError {
    /// The model could not be built.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    /// The rules could not be evaluated.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Rules(#[from] RuleSetError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    #[diagnostic(code(code_assert::config))]
    Config(#[from] ConfigError),

    /// Nothing to analyze.
    #[error("no inputs given")]
    #[diagnostic(
        code(code_assert::no_inputs),
        help("pass paths on the command line or set `model.inputs` in code-assert.toml")
    )]
    NoInputs,
}

/// Builder for configuring an [`Analyzer`].
#[derive(Debug, Default)]
pub struct AnalyzerBuilder {
    inputs: Vec<PathBuf>,
    config: Option<AnalysisConfig>,
    rules: Option<RuleSet>,
    cycles: Option<bool>,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input path; given inputs replace those of the configuration.
    #[must_use]
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    /// Adds multiple input paths.
    #[must_use]
    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the rule set, replacing the configured one.
    #[must_use]
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Enables or disables cycle detection, overriding the configuration.
    #[must_use]
    pub fn cycles(mut self, enabled: bool) -> Self {
        self.cycles = Some(enabled);
        self
    }

    /// Builds the analyzer.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::NoInputs`] if neither the builder nor the
    /// configuration names an input.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let mut config = self.config.unwrap_or_default();
        if !self.inputs.is_empty() {
            config.model.inputs = self.inputs;
        }
        if config.model.inputs.is_empty() {
            return Err(AnalyzerError::NoInputs);
        }
        if let Some(rules) = self.rules {
            config.rules = Some(rules);
        }
        if let Some(enabled) = self.cycles {
            config.cycles.enabled = enabled;
        }
        Ok(Analyzer { config })
    }
}

/// Runs a complete analysis.
///
/// Use [`Analyzer::builder()`] to construct an instance.
///
/// ```no_run
/// use code_assert_core::{Analyzer, ClosureMode, RelationKind, RuleSet};
///
/// let rules = RuleSet::builder(ClosureMode::DenyByDefault)
///     .external("java.*")
///     .relation("com.acme.api", RelationKind::MayUse, ["com.acme.model"])
///     .rule("com.acme.model")
///     .seal()?;
/// let result = Analyzer::builder()
///     .input("target/classes")
///     .rules(rules)
///     .build()?
///     .analyze()?;
/// result.print_report();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Builds the model from the configured inputs and checks it.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be built or a rule is ambiguous.
    pub fn analyze(&self) -> Result<AnalysisResult, AnalyzerError> {
        info!("Starting analysis of {:?}", self.config.model.inputs);
        let settings = &self.config.model;
        let mut builder = ModelBuilder::new()
            .inputs(settings.inputs.iter().cloned())
            .ignoring_packages(settings.ignore_packages.iter().cloned())
            .merging_packages(settings.merge_packages.iter().cloned())
            .languages(settings.languages.iter().copied());
        if let Some(threads) = settings.parallelism {
            builder = builder.parallelism(threads);
        }
        let outcome = builder.build()?;
        self.check(&outcome)
    }

    /// Checks an already built model.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzerError::Rules`] if a rule is ambiguous for one of the
    /// model's dependencies.
    pub fn check(&self, outcome: &BuildOutcome) -> Result<AnalysisResult, AnalyzerError> {
        let model = &outcome.model;
        let mut result = AnalysisResult::new();
        result.packages_checked = model.package_count();
        result.classes_checked = model.class_count();

        let mut filter = IgnoreFilter::new(&self.config.ignores);

        if let Some(rules) = &self.config.rules {
            let report = rules.evaluate(model)?;
            let (violations, ignored) =
                filter.retain(report.violations, |p, v| p.matches_edge(&v.from, &v.to));
            result.ignored += ignored;
            result.findings.extend(violations.iter().map(Finding::from));

            let (undefined, ignored) = filter.retain(report.undefined, |p, name| p.matches_name(name));
            result.ignored += ignored;
            result
                .findings
                .extend(undefined.iter().map(|name| Finding::undefined_package(name)));
            result.findings.extend(report.unused.iter().map(Finding::from));
        }

        if self.config.cycles.enabled {
            let allow_intra_package = self
                .config
                .rules
                .as_ref()
                .is_some_and(RuleSet::allow_intra_package_cycles);
            let report = detect_cycles(model, &self.config.cycles, allow_intra_package);
            let (cycles, ignored) = filter.retain(report.cycles, |p, cycle: &Cycle| {
                cycle.members.iter().all(|m| p.matches_name(m))
            });
            result.ignored += ignored;
            result.findings.extend(
                cycles
                    .iter()
                    .map(|c| Finding::cycle(c, self.config.cycles.scope)),
            );
            result.findings.extend(
                report
                    .unused_exceptions
                    .iter()
                    .map(|g| Finding::unused_cycle_exception(g)),
            );
        }

        result.findings.extend(filter.unused().iter().map(Finding::from));
        result.findings.extend(outcome.skipped.iter().map(Finding::from));

        result
            .findings
            .sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.subject.cmp(&b.subject)));

        info!(
            "Analysis complete: {} findings in {} packages ({} ignored)",
            result.findings.len(),
            result.packages_checked,
            result.ignored
        );

        Ok(result)
    }
}

fn detect_cycles(model: &Model, settings: &CycleSettings, allow_intra_package: bool) -> CycleReport {
    CycleDetector::new(model, settings.scope)
        .allow_intra_package(allow_intra_package)
        .except(settings.allow.iter().cloned())
        .detect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractedClass;
    use crate::ignore::Ignore;
    use crate::model::SkippedEntry;
    use crate::rules::{ClosureMode, RelationKind};
    use crate::types::{FindingKind, Severity};

    fn outcome(classes: Vec<ExtractedClass>) -> BuildOutcome {
        BuildOutcome {
            model: Model::from_extracted(classes),
            skipped: Vec::new(),
        }
    }

    fn layered() -> BuildOutcome {
        outcome(vec![
            ExtractedClass::new("app.api.Api").with_reference("app.core.Core", 1),
            ExtractedClass::new("app.core.Core").with_reference("app.api.Api", 1),
            ExtractedClass::new("app.legacy.Old").with_reference("app.api.Api", 2),
        ])
    }

    fn rules() -> RuleSet {
        RuleSet::builder(ClosureMode::DenyByDefault)
            .relation("app.api", RelationKind::MayUse, ["app.core"])
            .relation("app.core", RelationKind::MayUse, ["app.api"])
            .rule("app.legacy")
            .seal()
            .expect("Failed to seal")
    }

    #[test]
    fn test_builder_requires_inputs() {
        let err = Analyzer::builder().build().unwrap_err();
        assert!(matches!(err, AnalyzerError::NoInputs));
    }

    #[test]
    fn test_builder_inputs_replace_config() {
        let mut config = AnalysisConfig::default();
        config.model.inputs = vec![PathBuf::from("from-config")];
        let analyzer = Analyzer::builder()
            .config(config)
            .input("from-builder")
            .cycles(false)
            .build()
            .expect("Failed to build analyzer");
        assert_eq!(analyzer.config().model.inputs, [PathBuf::from("from-builder")]);
        assert!(!analyzer.config().cycles.enabled);
    }

    #[test]
    fn test_check_reports_violations_and_cycles() {
        let analyzer = Analyzer::builder()
            .input(".")
            .rules(rules())
            .build()
            .expect("Failed to build analyzer");
        let result = analyzer.check(&layered()).expect("Failed to check");

        let codes: Vec<&str> = result.findings.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, ["CA001", "CA003"]);
        assert_eq!(result.findings[0].subject, "app.legacy -> app.api");
        assert_eq!(result.findings[1].subject, "app.api, app.core");
        assert!(result.has_errors());
        assert_eq!(result.packages_checked, 3);
        assert_eq!(result.classes_checked, 3);
    }

    #[test]
    fn test_ignores_suppress_and_report_unused() {
        let mut config = AnalysisConfig::default();
        config.ignores = vec![
            Ignore::new("being removed", ["app.legacy -> app.api"]).expect("valid"),
            Ignore::new("stale", ["app.gone*"]).expect("valid"),
        ];
        config.cycles.allow = vec![vec!["app.api".to_string(), "app.core".to_string()]];
        let analyzer = Analyzer::builder()
            .input(".")
            .config(config)
            .rules(rules())
            .build()
            .expect("Failed to build analyzer");
        let result = analyzer.check(&layered()).expect("Failed to check");

        assert_eq!(result.ignored, 1);
        assert!(!result.has_errors());
        let unused = result.by_kind(FindingKind::UnusedException);
        assert_eq!(unused.len(), 1);
        assert_eq!(unused[0].subject, "app.gone*");
        assert_eq!(unused[0].severity, Severity::Warning);
    }

    #[test]
    fn test_skipped_entries_become_warnings() {
        let mut built = layered();
        built.skipped.push(SkippedEntry {
            location: "lib/app.jar!/Broken.class".to_string(),
            reason: "bad magic".to_string(),
        });
        let analyzer = Analyzer::builder()
            .input(".")
            .cycles(false)
            .build()
            .expect("Failed to build analyzer");
        let result = analyzer.check(&built).expect("Failed to check");
        assert_eq!(result.findings.len(), 1);
        assert!(result.findings[0].is(FindingKind::SkippedEntry));
        assert!(result.has_warnings());
        assert!(!result.has_errors());
    }
}

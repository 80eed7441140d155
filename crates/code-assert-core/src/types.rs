//! Findings and analysis results.

use serde::{Deserialize, Serialize};

use crate::cycles::{Cycle, CycleScope};
use crate::ignore::UnusedIgnore;
use crate::model::SkippedEntry;
use crate::rules::{RuleViolation, UnusedRule, ViolationKind};

/// Severity level for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail a check.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What a finding reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    /// A dependency the rules do not allow.
    Disallowed,
    /// A mandatory dependency that does not exist.
    MissingMandatory,
    /// A dependency cycle.
    Cycle,
    /// A rule or relation target that matches no package.
    UnusedRule,
    /// A package no rule covers.
    UndefinedPackage,
    /// An input entry left out of the model.
    SkippedEntry,
    /// An ignore pattern or cycle exception that suppressed nothing.
    UnusedException,
}

impl FindingKind {
    /// Stable code (e.g. `CA001`).
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Disallowed => "CA001",
            Self::MissingMandatory => "CA002",
            Self::Cycle => "CA003",
            Self::UnusedRule => "CA004",
            Self::UndefinedPackage => "CA005",
            Self::SkippedEntry => "CA006",
            Self::UnusedException => "CA007",
        }
    }

    /// Human-readable name (e.g. `disallowed-dependency`).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Disallowed => "disallowed-dependency",
            Self::MissingMandatory => "missing-dependency",
            Self::Cycle => "dependency-cycle",
            Self::UnusedRule => "unused-rule",
            Self::UndefinedPackage => "undefined-package",
            Self::SkippedEntry => "skipped-entry",
            Self::UnusedException => "unused-exception",
        }
    }

    /// Severity findings of this kind get.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::Disallowed | Self::MissingMandatory | Self::Cycle => Severity::Error,
            Self::UnusedRule | Self::SkippedEntry | Self::UnusedException => Severity::Warning,
            Self::UndefinedPackage => Severity::Info,
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Finding code (e.g., "CA001").
    pub code: String,
    /// Finding name (e.g., "disallowed-dependency").
    pub rule: String,
    /// Severity of this finding.
    pub severity: Severity,
    /// What the finding is about: `from -> to`, a package, a pattern or a location.
    pub subject: String,
    /// Human-readable message.
    pub message: String,
    /// Supporting lines, e.g. the classes realizing a dependency.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl Finding {
    /// Creates a finding with the kind's code, name and severity.
    #[must_use]
    pub fn new(kind: FindingKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: kind.code().to_string(),
            rule: kind.name().to_string(),
            severity: kind.severity(),
            subject: subject.into(),
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Adds supporting lines.
    #[must_use]
    pub fn with_details<I, S>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.details.extend(details.into_iter().map(Into::into));
        self
    }

    /// Whether the finding has the given kind.
    #[must_use]
    pub fn is(&self, kind: FindingKind) -> bool {
        self.code == kind.code()
    }

    /// Formats the finding for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!("{} {} at {}\n", self.code, self.rule, self.subject);
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        for detail in &self.details {
            let _ = writeln!(output, "  = {detail}");
        }
        output
    }

    /// A package that no rule covers.
    #[must_use]
    pub fn undefined_package(package: &str) -> Self {
        Self::new(
            FindingKind::UndefinedPackage,
            package,
            "package is not covered by any rule",
        )
    }

    /// A cycle exception that suppressed nothing.
    #[must_use]
    pub fn unused_cycle_exception(group: &[String]) -> Self {
        Self::new(
            FindingKind::UnusedException,
            group.join(", "),
            "allowed cycle group matches no cycle",
        )
    }

    /// A cycle in the given scope.
    #[must_use]
    pub fn cycle(cycle: &Cycle, scope: CycleScope) -> Self {
        let noun = match scope {
            CycleScope::Packages => "packages",
            CycleScope::Classes => "classes",
        };
        Self::new(
            FindingKind::Cycle,
            cycle.members.join(", "),
            format!("dependency cycle between {} {noun}", cycle.members.len()),
        )
        .with_details(cycle.edges.iter().map(|e| {
            if e.vias.is_empty() {
                format!("{} -> {}", e.from, e.to)
            } else {
                format!("{} -> {} (via {})", e.from, e.to, e.vias.join(", "))
            }
        }))
    }
}

impl From<&RuleViolation> for Finding {
    fn from(v: &RuleViolation) -> Self {
        let subject = format!("{} -> {}", v.from, v.to);
        match v.kind {
            ViolationKind::Disallowed => Self::new(
                FindingKind::Disallowed,
                subject,
                format!("`{}` is not allowed to use `{}`", v.from, v.to),
            )
            .with_details(v.vias.iter().map(|c| format!("via {c}"))),
            ViolationKind::MissingMandatory => Self::new(
                FindingKind::MissingMandatory,
                subject,
                format!("`{}` must use `{}`", v.from, v.to),
            ),
        }
    }
}

impl From<&UnusedRule> for Finding {
    fn from(u: &UnusedRule) -> Self {
        let message = match u.relation {
            None => format!("rule `{}` matches no package", u.rule),
            Some(kind) => format!("{kind} target `{}` of rule `{}` matches no package", u.pattern, u.rule),
        };
        Self::new(FindingKind::UnusedRule, u.pattern.clone(), message)
    }
}

impl From<&SkippedEntry> for Finding {
    fn from(s: &SkippedEntry) -> Self {
        Self::new(FindingKind::SkippedEntry, s.location.clone(), s.reason.clone())
    }
}

impl From<&UnusedIgnore> for Finding {
    fn from(u: &UnusedIgnore) -> Self {
        Self::new(
            FindingKind::UnusedException,
            u.pattern.clone(),
            format!("ignore pattern suppressed nothing (because: {})", u.because),
        )
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.subject, self.severity, self.code, self.message
        )
    }
}

/// Result of running an analysis.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// All findings, grouped by kind in report order.
    pub findings: Vec<Finding>,
    /// Number of packages read from the inputs.
    pub packages_checked: usize,
    /// Number of classes read from the inputs.
    pub classes_checked: usize,
    /// Number of findings suppressed by ignore patterns.
    pub ignored: usize,
}

impl AnalysisResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Returns true if there are any warnings or errors.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(|f| f.severity >= Severity::Warning)
    }

    /// Returns findings of one kind.
    #[must_use]
    pub fn by_kind(&self, kind: FindingKind) -> Vec<&Finding> {
        self.findings.iter().filter(|f| f.is(kind)).collect()
    }

    /// Counts findings by severity.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        let count = |severity| self.findings.iter().filter(|f| f.severity == severity).count();
        (
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info),
        )
    }

    /// Prints a summary report to stdout.
    pub fn print_report(&self) {
        for finding in &self.findings {
            println!("{}", finding.format());
        }
        println!("\n{}", self.summary());
    }

    /// One-line totals.
    #[must_use]
    pub fn summary(&self) -> String {
        let (errors, warnings, infos) = self.count_by_severity();
        format!(
            "Found {} error(s), {} warning(s), {} info(s) in {} package(s), {} class(es); {} ignored",
            errors, warnings, infos, self.packages_checked, self.classes_checked, self.ignored
        )
    }

    /// Formats findings as a test failure report.
    ///
    /// Produces a human-readable multi-line report suitable for `panic!()` messages
    /// in `cargo test` integration.
    #[must_use]
    pub fn format_test_report(&self, fail_on: Severity) -> String {
        use std::fmt::Write;

        let failing: Vec<&Finding> = self
            .findings
            .iter()
            .filter(|f| f.severity >= fail_on)
            .collect();

        let mut report = String::new();
        let _ = writeln!(
            report,
            "\n=== code-assert: {} finding(s) ===\n",
            failing.len()
        );
        for finding in &failing {
            let _ = writeln!(report, "{}", finding.format());
        }
        let _ = writeln!(report, "{}", self.summary());
        report
    }

    /// Checks if any findings meet or exceed the given severity threshold.
    #[must_use]
    pub fn has_violations_at(&self, severity: Severity) -> bool {
        self.findings.iter().any(|f| f.severity >= severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycles::CycleEdge;

    fn violation(kind: ViolationKind) -> RuleViolation {
        RuleViolation {
            from: "com.acme.api".to_string(),
            to: "com.acme.impl".to_string(),
            kind,
            vias: vec!["com.acme.api.Service".to_string()],
        }
    }

    #[test]
    fn finding_from_disallowed_violation() {
        let f = Finding::from(&violation(ViolationKind::Disallowed));
        assert_eq!(f.code, "CA001");
        assert_eq!(f.severity, Severity::Error);
        assert_eq!(f.subject, "com.acme.api -> com.acme.impl");
        assert_eq!(f.details, ["via com.acme.api.Service"]);
        assert_eq!(
            f.to_string(),
            "com.acme.api -> com.acme.impl: error [CA001] `com.acme.api` is not allowed to use `com.acme.impl`"
        );
    }

    #[test]
    fn finding_format_lists_details() {
        let cycle = Cycle {
            members: vec!["a".to_string(), "b".to_string()],
            edges: vec![
                CycleEdge {
                    from: "a".to_string(),
                    to: "b".to_string(),
                    vias: vec!["a.A".to_string()],
                },
                CycleEdge {
                    from: "b".to_string(),
                    to: "a".to_string(),
                    vias: vec![],
                },
            ],
        };
        let formatted = Finding::cycle(&cycle, CycleScope::Packages).format();
        assert_eq!(
            formatted,
            "CA003 dependency-cycle at a, b\n  error: dependency cycle between 2 packages\n  = a -> b (via a.A)\n  = b -> a\n"
        );
    }

    #[test]
    fn unused_rule_messages() {
        let rule = UnusedRule {
            rule: "com.acme.*".to_string(),
            relation: None,
            pattern: "com.acme.*".to_string(),
        };
        assert_eq!(
            Finding::from(&rule).message,
            "rule `com.acme.*` matches no package"
        );
        let target = UnusedRule {
            relation: Some(crate::rules::RelationKind::MayUse),
            pattern: "gone".to_string(),
            ..rule
        };
        assert_eq!(
            Finding::from(&target).message,
            "may-use target `gone` of rule `com.acme.*` matches no package"
        );
    }

    #[test]
    fn has_violations_at_error_only() {
        let mut result = AnalysisResult::new();
        result.findings.push(Finding::undefined_package("x"));
        result.findings.push(Finding::unused_cycle_exception(&["a".to_string()]));
        assert!(!result.has_violations_at(Severity::Error));
        assert!(result.has_violations_at(Severity::Warning));
        assert!(!result.has_errors());
        assert_eq!(result.count_by_severity(), (0, 1, 1));
    }

    #[test]
    fn format_test_report_filters_by_severity() {
        let mut result = AnalysisResult::new();
        result.packages_checked = 5;
        result.findings.push(Finding::undefined_package("x"));
        result
            .findings
            .push(Finding::from(&violation(ViolationKind::MissingMandatory)));

        let report = result.format_test_report(Severity::Error);
        assert!(report.contains("1 finding(s)"));
        assert!(report.contains("1 error(s)"));
        assert!(report.contains("1 info(s)"));
        assert!(!report.contains("CA005"));
        assert_eq!(result.by_kind(FindingKind::MissingMandatory).len(), 1);
    }
}

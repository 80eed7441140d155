//! Declarative package dependency rules.
//!
//! A [`RuleSet`] is a list of package rules, each with "use" relations
//! (`may-use`, `must-use`, `must-not-use`) and "used by" relations
//! (`may-be-used-by`, ...), plus a [`ClosureMode`] deciding what happens to
//! dependencies no relation mentions. It is assembled with a
//! [`RuleSetBuilder`], validated once by [`RuleSetBuilder::seal`], and then
//! evaluated against any number of models.
//!
//! ```
//! use code_assert_core::rules::{ClosureMode, RelationKind, RuleSet};
//!
//! let rules = RuleSet::builder(ClosureMode::DenyByDefault)
//!     .external("java.*")
//!     .relation("com.acme.api", RelationKind::MayUse, ["com.acme.model"])
//!     .relation("com.acme.model", RelationKind::MustNotUse, ["com.acme.api"])
//!     .seal()
//!     .unwrap();
//! assert_eq!(rules.rules().len(), 3);
//! ```

mod engine;
mod family;
mod pattern;

pub use engine::{RuleReport, RuleViolation, UnusedRule, ViolationKind};
pub use family::{RuleFamily, RuleHandle};
pub use pattern::{PackagePattern, PatternError};

use std::collections::BTreeMap;
use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happens to a dependency that no relation allows or denies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosureMode {
    /// Anything not explicitly denied is permitted.
    AllowByDefault,
    /// Anything not explicitly allowed is a violation.
    #[default]
    DenyByDefault,
}

/// The kind of a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    /// The rule's packages may use the targets.
    MayUse,
    /// The rule's packages must use every target package.
    MustUse,
    /// The rule's packages must not use the targets.
    MustNotUse,
    /// The targets may use the rule's packages.
    MayBeUsedBy,
    /// Every target package must use the rule's packages.
    MustBeUsedBy,
    /// The targets must not use the rule's packages.
    MustNotBeUsedBy,
}

impl RelationKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::MayUse,
        Self::MustUse,
        Self::MustNotUse,
        Self::MayBeUsedBy,
        Self::MustBeUsedBy,
        Self::MustNotBeUsedBy,
    ];

    /// Relations attached to the used package rather than the user.
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::MayBeUsedBy | Self::MustBeUsedBy | Self::MustNotBeUsedBy
        )
    }

    /// Relations that deny a dependency.
    #[must_use]
    pub fn is_denial(self) -> bool {
        matches!(self, Self::MustNotUse | Self::MustNotBeUsedBy)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MayUse => "may-use",
            Self::MustUse => "must-use",
            Self::MustNotUse => "must-not-use",
            Self::MayBeUsedBy => "may-be-used-by",
            Self::MustBeUsedBy => "must-be-used-by",
            Self::MustNotBeUsedBy => "must-not-be-used-by",
        };
        f.write_str(name)
    }
}

/// An unvalidated `(pattern, kind, targets)` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// The rule the relation belongs to.
    pub pattern: String,
    /// Relation kind.
    pub kind: RelationKind,
    /// Target patterns; empty to only declare the rule.
    pub targets: Vec<String>,
}

/// Errors building or evaluating a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RuleSetError {
    /// A rule or target pattern is malformed.
    #[error("{context}: {source}")]
    #[diagnostic(
        code(code_assert::rules::pattern),
        help("use a dotted package name, optionally ending in `*` (`com.acme.*`)")
    )]
    InvalidPattern {
        /// Where the pattern was declared.
        context: String,
        /// The pattern error.
        source: PatternError,
    },

    /// The same dependency is declared both allowed and denied.
    #[error("`{rule}` -> `{target}` is declared both {allowed} and {denied}")]
    #[diagnostic(code(code_assert::rules::conflict))]
    Conflict {
        /// The using side.
        rule: String,
        /// The used side.
        target: String,
        /// The allowing relation.
        allowed: RelationKind,
        /// The denying relation.
        denied: RelationKind,
    },

    /// Allowing and denying relations of equal specificity apply to one dependency.
    #[error("rule `{rule}` is ambiguous for dependency {from} -> {to}")]
    #[diagnostic(
        code(code_assert::rules::ambiguous),
        help("make one of the conflicting patterns more specific")
    )]
    Ambiguous {
        /// The rule being evaluated.
        rule: String,
        /// Using package.
        from: String,
        /// Used package.
        to: String,
    },
}

/// Relations of one direction of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relations {
    /// `may` targets.
    pub may: Vec<PackagePattern>,
    /// `must` targets.
    pub must: Vec<PackagePattern>,
    /// `must not` targets.
    pub must_not: Vec<PackagePattern>,
}

impl Relations {
    fn push(&mut self, kind: RelationKind, pattern: PackagePattern) {
        let list = match kind {
            RelationKind::MayUse | RelationKind::MayBeUsedBy => &mut self.may,
            RelationKind::MustUse | RelationKind::MustBeUsedBy => &mut self.must,
            RelationKind::MustNotUse | RelationKind::MustNotBeUsedBy => &mut self.must_not,
        };
        if !list.contains(&pattern) {
            list.push(pattern);
        }
    }

    fn is_empty(&self) -> bool {
        self.may.is_empty() && self.must.is_empty() && self.must_not.is_empty()
    }

    /// Highest specificity of a `may` or `must` pattern matching `package`, 0 if none.
    fn allowed(&self, package: &str) -> u8 {
        most_specific(self.may.iter().chain(&self.must), package)
    }

    /// Highest specificity of a `must not` pattern matching `package`, 0 if none.
    fn denied(&self, package: &str) -> u8 {
        most_specific(&self.must_not, package)
    }
}

fn most_specific<'a>(patterns: impl IntoIterator<Item = &'a PackagePattern>, package: &str) -> u8 {
    patterns
        .into_iter()
        .filter(|p| p.matches(package))
        .map(PackagePattern::specificity)
        .max()
        .unwrap_or(0)
}

/// One validated package rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Packages the rule applies to.
    pub pattern: PackagePattern,
    /// Relations to used packages.
    pub uses: Relations,
    /// Relations to using packages.
    pub used_by: Relations,
    /// Not reported when it matches nothing (externals).
    pub optional: bool,
}

impl Rule {
    fn new(pattern: PackagePattern) -> Self {
        Self {
            pattern,
            uses: Relations::default(),
            used_by: Relations::default(),
            optional: false,
        }
    }

    /// Whether the rule declares no relations at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uses.is_empty() && self.used_by.is_empty()
    }
}

/// A sealed, immutable rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    mode: ClosureMode,
    rules: Vec<Rule>,
    allow_intra_package_cycles: bool,
}

impl RuleSet {
    /// Starts building a rule set.
    #[must_use]
    pub fn builder(mode: ClosureMode) -> RuleSetBuilder {
        RuleSetBuilder::new(mode)
    }

    /// The closure mode.
    #[must_use]
    pub fn mode(&self) -> ClosureMode {
        self.mode
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether class cycles within one package are tolerated.
    #[must_use]
    pub fn allow_intra_package_cycles(&self) -> bool {
        self.allow_intra_package_cycles
    }
}

/// Collects rule declarations until [`seal`](Self::seal) validates them.
#[derive(Debug, Clone)]
pub struct RuleSetBuilder {
    mode: ClosureMode,
    rules: Vec<String>,
    relations: Vec<Relation>,
    externals: Vec<String>,
    allow_intra_package_cycles: bool,
}

impl RuleSetBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(mode: ClosureMode) -> Self {
        Self {
            mode,
            rules: Vec::new(),
            relations: Vec::new(),
            externals: Vec::new(),
            allow_intra_package_cycles: false,
        }
    }

    /// Declares a rule without relations.
    #[must_use]
    pub fn rule(mut self, pattern: impl Into<String>) -> Self {
        self.rules.push(pattern.into());
        self
    }

    /// Declares a relation, creating the rule if needed.
    #[must_use]
    pub fn relation<I, S>(mut self, pattern: impl Into<String>, kind: RelationKind, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations.push(Relation {
            pattern: pattern.into(),
            kind,
            targets: targets.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Adds previously collected relations, e.g. from a [`RuleFamily`].
    #[must_use]
    pub fn relations(mut self, relations: impl IntoIterator<Item = Relation>) -> Self {
        self.relations.extend(relations);
        self
    }

    /// Declares an external package: anyone may use it and it is never
    /// reported as unused.
    #[must_use]
    pub fn external(mut self, pattern: impl Into<String>) -> Self {
        self.externals.push(pattern.into());
        self
    }

    /// Tolerates class cycles within a single package.
    #[must_use]
    pub fn allow_intra_package_cycles(mut self, allow: bool) -> Self {
        self.allow_intra_package_cycles = allow;
        self
    }

    /// Validates patterns and conflicts and produces the rule set.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError::InvalidPattern`] for a malformed pattern and
    /// [`RuleSetError::Conflict`] when one dependency is both allowed and
    /// denied by explicit relations.
    pub fn seal(self) -> Result<RuleSet, RuleSetError> {
        let mut rules: Vec<Rule> = Vec::new();
        let mut index: BTreeMap<PackagePattern, usize> = BTreeMap::new();
        let mut rule_for = |pattern: PackagePattern, rules: &mut Vec<Rule>| -> usize {
            *index.entry(pattern.clone()).or_insert_with(|| {
                rules.push(Rule::new(pattern));
                rules.len() - 1
            })
        };

        for (i, raw) in self.rules.iter().enumerate() {
            let pattern = parse(raw, || format!("rules[{i}]"))?;
            rule_for(pattern, &mut rules);
        }

        // (using pattern, used pattern) -> (allowing kind, denying kind)
        let mut declared: BTreeMap<(String, String), (Option<RelationKind>, Option<RelationKind>)> =
            BTreeMap::new();

        for (i, relation) in self.relations.iter().enumerate() {
            let pattern = parse(&relation.pattern, || format!("relations[{i}]"))?;
            let at = rule_for(pattern, &mut rules);
            for (j, raw) in relation.targets.iter().enumerate() {
                let target = parse(raw, || format!("relations[{i}].{}[{j}]", relation.kind))?;
                let rule_name = rules[at].pattern.to_string();
                let key = if relation.kind.is_reverse() {
                    (target.to_string(), rule_name)
                } else {
                    (rule_name, target.to_string())
                };
                let entry = declared.entry(key.clone()).or_default();
                if relation.kind.is_denial() {
                    entry.1.get_or_insert(relation.kind);
                } else {
                    entry.0.get_or_insert(relation.kind);
                }
                if let (Some(allowed), Some(denied)) = *entry {
                    return Err(RuleSetError::Conflict {
                        rule: key.0,
                        target: key.1,
                        allowed,
                        denied,
                    });
                }

                let rule = &mut rules[at];
                if relation.kind.is_reverse() {
                    rule.used_by.push(relation.kind, target);
                } else {
                    rule.uses.push(relation.kind, target);
                }
            }
        }

        let everyone = parse("*", || "externals".to_string())?;
        for (i, raw) in self.externals.iter().enumerate() {
            let pattern = parse(raw, || format!("externals[{i}]"))?;
            let at = rule_for(pattern, &mut rules);
            let rule = &mut rules[at];
            rule.optional = true;
            rule.used_by.push(RelationKind::MayBeUsedBy, everyone.clone());
        }

        Ok(RuleSet {
            mode: self.mode,
            rules,
            allow_intra_package_cycles: self.allow_intra_package_cycles,
        })
    }
}

fn parse(raw: &str, context: impl FnOnce() -> String) -> Result<PackagePattern, RuleSetError> {
    PackagePattern::new(raw).map_err(|source| RuleSetError::InvalidPattern {
        context: context(),
        source,
    })
}

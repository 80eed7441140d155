//! Evaluation of a [`RuleSet`] against a [`Model`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, debug_span};

use super::{ClosureMode, PackagePattern, RelationKind, Rule, RuleSet, RuleSetError};
use crate::model::{Model, PackageId};
use crate::usage::UsageCounter;

/// Why a dependency was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// An observed dependency that is denied or not allowed.
    Disallowed,
    /// A mandatory dependency that does not exist.
    MissingMandatory,
}

/// One rule violation between two packages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RuleViolation {
    /// Using package.
    pub from: String,
    /// Used package.
    pub to: String,
    /// Violation kind.
    pub kind: ViolationKind,
    /// Classes of `from` that realize the dependency; empty for missing ones.
    pub vias: Vec<String>,
}

/// A declaration that matched no package of the model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnusedRule {
    /// Pattern of the rule.
    pub rule: String,
    /// Relation the unused pattern belongs to; `None` for the rule pattern itself.
    pub relation: Option<RelationKind>,
    /// The pattern that matched nothing.
    pub pattern: String,
}

/// Result of evaluating a rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    /// Violations, sorted by `from`, `to` and kind.
    pub violations: Vec<RuleViolation>,
    /// Declarations that matched nothing.
    pub unused: Vec<UnusedRule>,
    /// Packages that no rule pattern matches.
    pub undefined: Vec<String>,
}

impl RuleReport {
    /// Whether no violations were found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

impl RuleSet {
    /// Evaluates all rules against `model`.
    ///
    /// Each observed package dependency is checked against every rule whose
    /// pattern matches the using package; packages no rule matches are
    /// checked against the closure mode alone. An explicit allowance from a
    /// more specific rule overrides a denial from a less specific one.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError::Ambiguous`] if a rule allows and denies one
    /// dependency with equally specific patterns.
    pub fn evaluate(&self, model: &Model) -> Result<RuleReport, RuleSetError> {
        let _span = debug_span!("evaluate_rules", rules = self.rules.len()).entered();
        let mut evaluation = Evaluation {
            rules: self,
            model,
            allowed: BTreeMap::new(),
            denied: BTreeMap::new(),
            missing: BTreeSet::new(),
        };

        for (id, package) in model.packages() {
            let owners: Vec<&Rule> = self
                .rules
                .iter()
                .filter(|r| r.pattern.matches(&package.name))
                .collect();
            for &target in model.uses(id) {
                evaluation.check_edge(id, target, &owners)?;
            }
        }
        evaluation.check_mandatory();

        // An explicit allowance is stronger than a less specific denial.
        let allowed = evaluation.allowed;
        let mut denied = evaluation.denied;
        denied.retain(|edge, spec| allowed.get(edge).map_or(true, |a| *a <= *spec));

        let mut violations: Vec<RuleViolation> = denied
            .into_keys()
            .map(|(from, to)| RuleViolation {
                from: model[from].name.clone(),
                to: model[to].name.clone(),
                kind: ViolationKind::Disallowed,
                vias: model
                    .vias(from, to)
                    .into_iter()
                    .map(|c| model[c].name.clone())
                    .collect(),
            })
            .chain(evaluation.missing.into_iter().map(|(from, to)| RuleViolation {
                from: model[from].name.clone(),
                to: model[to].name.clone(),
                kind: ViolationKind::MissingMandatory,
                vias: Vec::new(),
            }))
            .collect();
        violations.sort();

        let report = RuleReport {
            violations,
            unused: self.unused(model),
            undefined: model
                .packages()
                .filter(|(_, p)| !self.rules.iter().any(|r| r.pattern.matches(&p.name)))
                .map(|(_, p)| p.name.clone())
                .collect(),
        };
        debug!(
            "Rule evaluation: {} violations, {} unused, {} undefined",
            report.violations.len(),
            report.unused.len(),
            report.undefined.len()
        );
        Ok(report)
    }

    fn unused(&self, model: &Model) -> Vec<UnusedRule> {
        let mut counter = UsageCounter::new();
        let mut declare = |rule: &Rule, relation: Option<RelationKind>, pattern: &PackagePattern| {
            let key = UnusedRule {
                rule: rule.pattern.to_string(),
                relation,
                pattern: pattern.to_string(),
            };
            let hits = model
                .packages()
                .filter(|(_, p)| pattern.matches(&p.name))
                .count();
            counter.declare(key.clone());
            counter.record_n(&key, hits);
        };

        for rule in self.rules.iter().filter(|r| !r.optional) {
            declare(rule, None, &rule.pattern);
            for (kind, patterns) in [
                (RelationKind::MayUse, &rule.uses.may),
                (RelationKind::MustUse, &rule.uses.must),
                (RelationKind::MustNotUse, &rule.uses.must_not),
                (RelationKind::MayBeUsedBy, &rule.used_by.may),
                (RelationKind::MustBeUsedBy, &rule.used_by.must),
                (RelationKind::MustNotBeUsedBy, &rule.used_by.must_not),
            ] {
                for pattern in patterns {
                    declare(rule, Some(kind), pattern);
                }
            }
        }
        counter.unused()
    }
}

type Edge = (PackageId, PackageId);

struct Evaluation<'a> {
    rules: &'a RuleSet,
    model: &'a Model,
    /// Edge -> specificity of the most specific allowing rule.
    allowed: BTreeMap<Edge, u8>,
    /// Edge -> specificity of the weakest denying rule (0 when denied by default).
    denied: BTreeMap<Edge, u8>,
    missing: BTreeSet<Edge>,
}

impl Evaluation<'_> {
    fn name(&self, id: PackageId) -> &str {
        &self.model[id].name
    }

    /// A dependency inside the territory of any named rule owning the package.
    fn is_self_reference(&self, owners: &[&Rule], to: PackageId) -> bool {
        owners
            .iter()
            .filter(|r| !r.pattern.is_universal())
            .any(|r| r.pattern.matches(self.name(to)))
    }

    /// Highest specificity of a used-by relation, on any rule matching `to`,
    /// whose pattern matches `from`.
    fn used_by(&self, from: &str, to: &str, deny: bool) -> u8 {
        self.rules
            .rules
            .iter()
            .filter(|r| r.pattern.matches(to))
            .map(|r| {
                if deny {
                    r.used_by.denied(from)
                } else {
                    r.used_by.allowed(from)
                }
            })
            .max()
            .unwrap_or(0)
    }

    fn check_edge(
        &mut self,
        from: PackageId,
        to: PackageId,
        owners: &[&Rule],
    ) -> Result<(), RuleSetError> {
        if self.is_self_reference(owners, to) {
            return Ok(());
        }
        let from_name = self.name(from).to_string();
        let to_name = self.name(to).to_string();
        let reverse_allowed = self.used_by(&from_name, &to_name, false);
        let reverse_denied = self.used_by(&from_name, &to_name, true);
        let allow_all = self.rules.mode == ClosureMode::AllowByDefault;

        // Unowned packages are judged by used-by relations and the closure mode.
        let judges: Vec<(Option<&PackagePattern>, u8, u8)> = if owners.is_empty() {
            vec![(None, reverse_allowed, reverse_denied)]
        } else {
            owners
                .iter()
                .map(|r| {
                    (
                        Some(&r.pattern),
                        r.uses.allowed(&to_name).max(reverse_allowed),
                        r.uses.denied(&to_name).max(reverse_denied),
                    )
                })
                .collect()
        };

        for (pattern, allowed, denied) in judges {
            let spec = pattern.map_or(0, PackagePattern::specificity);
            if allowed != 0 && allowed == denied {
                return Err(RuleSetError::Ambiguous {
                    rule: pattern.map_or_else(|| "*".to_string(), ToString::to_string),
                    from: from_name,
                    to: to_name,
                });
            }
            if allowed > denied || (allow_all && denied == 0) {
                let entry = self.allowed.entry((from, to)).or_insert(spec);
                *entry = (*entry).max(spec);
            }
            if denied > allowed || (!allow_all && allowed == 0) {
                let spec = if denied == 0 { 0 } else { spec };
                let entry = self.denied.entry((from, to)).or_insert(spec);
                *entry = (*entry).min(spec);
            }
        }
        Ok(())
    }

    fn check_mandatory(&mut self) {
        let rules = self.rules;
        for rule in &rules.rules {
            let sources = self.matching(&rule.pattern);
            for target in &rule.uses.must {
                for &from in &sources {
                    for to in self.matching(target) {
                        self.require(from, to);
                    }
                }
            }
            for source in &rule.used_by.must {
                for from in self.matching(source) {
                    for &to in &sources {
                        self.require(from, to);
                    }
                }
            }
        }
    }

    fn require(&mut self, from: PackageId, to: PackageId) {
        if from != to && !self.model.uses(from).contains(&to) {
            self.missing.insert((from, to));
        }
    }

    fn matching(&self, pattern: &PackagePattern) -> Vec<PackageId> {
        self.model
            .packages()
            .filter(|(_, p)| pattern.matches(&p.name))
            .map(|(id, _)| id)
            .collect()
    }
}

//! Registering rules for the sub-packages of one base package.

use super::{Relation, RelationKind};

/// A rule pattern handed out by a [`RuleFamily`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleHandle {
    pattern: String,
}

impl RuleHandle {
    /// A handle for an arbitrary pattern, e.g. an external package.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// The rule's package pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Rules for the sub-packages of one base package.
///
/// Element names are written in camel case and map to dotted sub-packages;
/// a trailing `_` covers the package and everything below it.
///
/// ```
/// use code_assert_core::rules::{ClosureMode, RuleFamily, RuleSet};
///
/// let mut acme = RuleFamily::new("com.acme");
/// let api = acme.element("api");
/// let model = acme.element("modelImpl");
/// let util = acme.element("util_");
/// assert_eq!(model.pattern(), "com.acme.model.impl");
/// assert_eq!(util.pattern(), "com.acme.util.*");
///
/// acme.may_use(&api, [&model, &util]);
/// acme.must_not_use(&model, [&api]);
///
/// let rules = RuleSet::builder(ClosureMode::DenyByDefault)
///     .relations(acme.into_relations())
///     .seal()
///     .unwrap();
/// assert_eq!(rules.rules().len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleFamily {
    base: String,
    elements: Vec<RuleHandle>,
    relations: Vec<Relation>,
}

impl RuleFamily {
    /// Starts a family below `base`; an empty base registers top-level packages.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    /// Registers the sub-package named by `name`.
    ///
    /// `modelImpl` becomes `base.model.impl`, `util_` becomes `base.util.*`,
    /// and names containing `$` are split on `$` instead of on upper case.
    pub fn element(&mut self, name: &str) -> RuleHandle {
        self.register(join(&self.base, &to_package(name)))
    }

    /// The base package itself.
    pub fn base(&mut self) -> RuleHandle {
        self.register(self.base.clone())
    }

    /// The base package and everything below it.
    pub fn all(&mut self) -> RuleHandle {
        let pattern = if self.base.is_empty() {
            "*".to_string()
        } else {
            format!("{}.*", self.base.trim_end_matches('.'))
        };
        self.register(pattern)
    }

    fn register(&mut self, pattern: String) -> RuleHandle {
        let handle = RuleHandle { pattern };
        if !self.elements.contains(&handle) {
            self.elements.push(handle.clone());
        }
        handle
    }

    /// `rule` may use the targets.
    pub fn may_use<'a>(&mut self, rule: &RuleHandle, targets: impl IntoIterator<Item = &'a RuleHandle>) {
        self.relate(rule, RelationKind::MayUse, targets);
    }

    /// `rule` must use every package matched by the targets.
    pub fn must_use<'a>(&mut self, rule: &RuleHandle, targets: impl IntoIterator<Item = &'a RuleHandle>) {
        self.relate(rule, RelationKind::MustUse, targets);
    }

    /// `rule` must not use the targets.
    pub fn must_not_use<'a>(
        &mut self,
        rule: &RuleHandle,
        targets: impl IntoIterator<Item = &'a RuleHandle>,
    ) {
        self.relate(rule, RelationKind::MustNotUse, targets);
    }

    /// The sources may use `rule`.
    pub fn may_be_used_by<'a>(
        &mut self,
        rule: &RuleHandle,
        sources: impl IntoIterator<Item = &'a RuleHandle>,
    ) {
        self.relate(rule, RelationKind::MayBeUsedBy, sources);
    }

    /// Every package matched by the sources must use `rule`.
    pub fn must_be_used_by<'a>(
        &mut self,
        rule: &RuleHandle,
        sources: impl IntoIterator<Item = &'a RuleHandle>,
    ) {
        self.relate(rule, RelationKind::MustBeUsedBy, sources);
    }

    /// The sources must not use `rule`.
    pub fn must_not_be_used_by<'a>(
        &mut self,
        rule: &RuleHandle,
        sources: impl IntoIterator<Item = &'a RuleHandle>,
    ) {
        self.relate(rule, RelationKind::MustNotBeUsedBy, sources);
    }

    fn relate<'a>(
        &mut self,
        rule: &RuleHandle,
        kind: RelationKind,
        targets: impl IntoIterator<Item = &'a RuleHandle>,
    ) {
        self.relations.push(Relation {
            pattern: rule.pattern.clone(),
            kind,
            targets: targets.into_iter().map(|t| t.pattern.clone()).collect(),
        });
    }

    /// Registered elements followed by the declared relations.
    ///
    /// Elements without relations still become rules, so they are checked
    /// against the closure mode and reported when they match nothing.
    #[must_use]
    pub fn into_relations(self) -> Vec<Relation> {
        self.elements
            .into_iter()
            .map(|e| Relation {
                pattern: e.pattern,
                kind: RelationKind::MayUse,
                targets: Vec::new(),
            })
            .chain(self.relations)
            .collect()
    }
}

fn join(base: &str, sub: &str) -> String {
    if !base.is_empty() && !base.ends_with('.') && !sub.is_empty() {
        format!("{base}.{sub}")
    } else {
        format!("{base}{sub}")
    }
}

/// `fooBar` -> `foo.bar`, `foo_` -> `foo.*`, `foo$Bar` -> `foo.Bar`.
fn to_package(name: &str) -> String {
    let dollar_mode = name.contains('$');
    let count = name.chars().count();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c == '_' && i + 1 == count {
            out.push_str(if out.is_empty() || out.ends_with('.') { "*" } else { ".*" });
        } else if dollar_mode {
            out.push(if c == '$' && i > 0 { '.' } else { c });
        } else if c.is_uppercase() {
            if i > 0 {
                out.push('.');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_package() {
        assert_eq!(to_package("model"), "model");
        assert_eq!(to_package("modelImpl"), "model.impl");
        assert_eq!(to_package("Model"), "model");
        assert_eq!(to_package("util_"), "util.*");
        assert_eq!(to_package("_"), "*");
        assert_eq!(to_package("a$B_"), "a.B.*");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("com.acme", "api"), "com.acme.api");
        assert_eq!(join("com.acme.", "api"), "com.acme.api");
        assert_eq!(join("", "api"), "api");
        assert_eq!(join("com.acme", ""), "com.acme");
    }

    #[test]
    fn test_base_and_all() {
        let mut family = RuleFamily::new("com.acme");
        assert_eq!(family.base().pattern(), "com.acme");
        assert_eq!(family.all().pattern(), "com.acme.*");
        assert_eq!(RuleFamily::new("").all().pattern(), "*");
    }

    #[test]
    fn test_into_relations_registers_elements_first() {
        let mut family = RuleFamily::new("x");
        let a = family.element("a");
        let b = family.element("b");
        let a_again = family.element("a");
        assert_eq!(a, a_again);
        family.must_not_be_used_by(&a, [&b]);

        let relations = family.into_relations();
        let patterns: Vec<(&str, RelationKind, usize)> = relations
            .iter()
            .map(|r| (r.pattern.as_str(), r.kind, r.targets.len()))
            .collect();
        assert_eq!(
            patterns,
            [
                ("x.a", RelationKind::MayUse, 0),
                ("x.b", RelationKind::MayUse, 0),
                ("x.a", RelationKind::MustNotBeUsedBy, 1),
            ]
        );
        assert_eq!(relations[2].targets, ["x.b"]);
    }
}

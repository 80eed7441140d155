//! DTO → validated configuration, with a context path on every error.

use std::path::PathBuf;

use super::dto::{ConfigDto, CyclesDto, IgnoreDto, ModelDto, PackageRuleDto, RulesDto};
use super::{AnalysisConfig, CycleSettings, ModelSettings};
use crate::cycles::CycleScope;
use crate::ignore::{Ignore, IgnoreError, IgnorePattern};
use crate::rules::{ClosureMode, PackagePattern, PatternError, RelationKind, RuleSet, RuleSetError};
use crate::source::Language;

/// Errors during DTO → configuration conversion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// A malformed package pattern.
    #[error("{context}: {source}")]
    Pattern {
        /// Where the pattern was declared (e.g. `rules.package[2].may-use[0]`).
        context: String,
        /// The pattern error.
        source: PatternError,
    },

    /// A malformed ignore pattern.
    #[error("{context}: {source}")]
    Ignore {
        /// Where the pattern was declared.
        context: String,
        /// The ignore error.
        source: IgnoreError,
    },

    /// An enumerated setting has an unknown value.
    #[error("{context}: unknown value `{value}`, expected one of: {expected}")]
    UnknownValue {
        /// The setting.
        context: String,
        /// The invalid value.
        value: String,
        /// Accepted values.
        expected: &'static str,
    },

    /// The rules are individually valid but contradict each other.
    #[error("rules: {0}")]
    Rules(#[from] RuleSetError),
}

/// Converts a [`ConfigDto`] to a validated [`AnalysisConfig`].
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load(dto: ConfigDto) -> Result<AnalysisConfig, LoadError> {
    Ok(AnalysisConfig {
        model: convert_model(dto.model)?,
        rules: dto.rules.map(convert_rules).transpose()?,
        cycles: convert_cycles(dto.cycles)?,
        ignores: dto
            .ignore
            .iter()
            .enumerate()
            .map(|(i, ignore)| convert_ignore(ignore, i))
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn convert_model(dto: ModelDto) -> Result<ModelSettings, LoadError> {
    let languages = match dto.languages {
        None => Language::ALL.to_vec(),
        Some(names) => names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                name.parse::<Language>().map_err(|_| LoadError::UnknownValue {
                    context: format!("model.languages[{i}]"),
                    value: name.clone(),
                    expected: "java, kotlin",
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(ModelSettings {
        inputs: dto.inputs.into_iter().map(PathBuf::from).collect(),
        ignore_packages: dto.ignore_packages,
        merge_packages: dto.merge_packages,
        languages,
        parallelism: dto.parallelism,
    })
}

fn convert_rules(dto: RulesDto) -> Result<RuleSet, LoadError> {
    let mode = match dto.mode.as_deref() {
        None | Some("deny-by-default") => ClosureMode::DenyByDefault,
        Some("allow-by-default") => ClosureMode::AllowByDefault,
        Some(other) => {
            return Err(LoadError::UnknownValue {
                context: "rules.mode".to_string(),
                value: other.to_string(),
                expected: "deny-by-default, allow-by-default",
            })
        }
    };

    let mut builder = RuleSet::builder(mode).allow_intra_package_cycles(dto.allow_intra_package_cycles);
    for (i, raw) in dto.externals.iter().enumerate() {
        check_pattern(raw, || format!("rules.externals[{i}]"))?;
        builder = builder.external(raw.as_str());
    }
    for (i, rule) in dto.package.iter().enumerate() {
        let context = format!("rules.package[{i}]");
        check_pattern(&rule.pattern, || format!("{context}.pattern"))?;
        builder = builder.rule(rule.pattern.as_str());
        for (kind, targets) in relations(rule) {
            for (j, target) in targets.iter().enumerate() {
                check_pattern(target, || format!("{context}.{kind}[{j}]"))?;
            }
            if !targets.is_empty() {
                builder = builder.relation(rule.pattern.as_str(), kind, targets);
            }
        }
    }
    Ok(builder.seal()?)
}

fn relations(rule: &PackageRuleDto) -> [(RelationKind, &Vec<String>); 6] {
    [
        (RelationKind::MayUse, &rule.may_use),
        (RelationKind::MustUse, &rule.must_use),
        (RelationKind::MustNotUse, &rule.must_not_use),
        (RelationKind::MayBeUsedBy, &rule.may_be_used_by),
        (RelationKind::MustBeUsedBy, &rule.must_be_used_by),
        (RelationKind::MustNotBeUsedBy, &rule.must_not_be_used_by),
    ]
}

fn check_pattern(raw: &str, context: impl FnOnce() -> String) -> Result<(), LoadError> {
    PackagePattern::new(raw)
        .map(drop)
        .map_err(|source| LoadError::Pattern {
            context: context(),
            source,
        })
}

fn convert_cycles(dto: CyclesDto) -> Result<CycleSettings, LoadError> {
    let scope = match dto.scope.as_deref() {
        None | Some("packages") => CycleScope::Packages,
        Some("classes") => CycleScope::Classes,
        Some(other) => {
            return Err(LoadError::UnknownValue {
                context: "cycles.scope".to_string(),
                value: other.to_string(),
                expected: "packages, classes",
            })
        }
    };
    Ok(CycleSettings {
        enabled: dto.enabled.unwrap_or(true),
        scope,
        allow: dto.allow,
    })
}

fn convert_ignore(dto: &IgnoreDto, index: usize) -> Result<Ignore, LoadError> {
    let patterns = dto
        .patterns
        .iter()
        .enumerate()
        .map(|(j, p)| {
            IgnorePattern::new(p).map_err(|source| LoadError::Ignore {
                context: format!("ignore[{index}].patterns[{j}]"),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Ignore {
        because: dto.because.clone(),
        patterns,
    })
}

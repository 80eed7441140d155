//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization.
//! They are converted to validated configuration by the loader.

use serde::Deserialize;

/// Raw `code-assert.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigDto {
    /// `[model]`
    #[serde(default)]
    pub model: ModelDto,
    /// `[rules]`; absent means no dependency rules are checked.
    #[serde(default)]
    pub rules: Option<RulesDto>,
    /// `[cycles]`
    #[serde(default)]
    pub cycles: CyclesDto,
    /// `[[ignore]]`
    #[serde(default)]
    pub ignore: Vec<IgnoreDto>,
}

/// `[model]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ModelDto {
    /// Directories, class files, archives and source files.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Class name prefixes to drop.
    #[serde(default)]
    pub ignore_packages: Vec<String>,
    /// Package prefixes to collapse.
    #[serde(default)]
    pub merge_packages: Vec<String>,
    /// Source languages (default: all).
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    /// Parser threads.
    #[serde(default)]
    pub parallelism: Option<usize>,
}

/// `[rules]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RulesDto {
    /// `deny-by-default` (default) or `allow-by-default`.
    #[serde(default)]
    pub mode: Option<String>,
    /// External package patterns.
    #[serde(default)]
    pub externals: Vec<String>,
    /// Tolerate class cycles inside one package.
    #[serde(default)]
    pub allow_intra_package_cycles: bool,
    /// `[[rules.package]]` entries.
    #[serde(default)]
    pub package: Vec<PackageRuleDto>,
}

/// One `[[rules.package]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PackageRuleDto {
    /// Package pattern the rule applies to.
    pub pattern: String,
    /// Packages the rule's packages may use.
    #[serde(default)]
    pub may_use: Vec<String>,
    /// Packages the rule's packages must use.
    #[serde(default)]
    pub must_use: Vec<String>,
    /// Packages the rule's packages must not use.
    #[serde(default)]
    pub must_not_use: Vec<String>,
    /// Packages that may use the rule's packages.
    #[serde(default)]
    pub may_be_used_by: Vec<String>,
    /// Packages that must use the rule's packages.
    #[serde(default)]
    pub must_be_used_by: Vec<String>,
    /// Packages that must not use the rule's packages.
    #[serde(default)]
    pub must_not_be_used_by: Vec<String>,
}

/// `[cycles]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CyclesDto {
    /// Whether to detect cycles (default: true).
    #[serde(default)]
    pub enabled: Option<bool>,
    /// `packages` (default) or `classes`.
    #[serde(default)]
    pub scope: Option<String>,
    /// Known cyclic groups.
    #[serde(default)]
    pub allow: Vec<Vec<String>>,
}

/// One `[[ignore]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct IgnoreDto {
    /// Why the findings are acceptable.
    pub because: String,
    /// `from` or `from -> to` patterns.
    pub patterns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_rules() {
        let toml = r#"
[rules]
mode = "allow-by-default"

[[rules.package]]
pattern = "com.acme.api"
may-use = ["com.acme.model"]
must-not-be-used-by = ["com.acme.impl"]
"#;
        let dto: ConfigDto = toml::from_str(toml).expect("Failed to parse");
        let rules = dto.rules.expect("rules section");
        assert_eq!(rules.mode.as_deref(), Some("allow-by-default"));
        assert_eq!(rules.package[0].may_use, ["com.acme.model"]);
        assert_eq!(rules.package[0].must_not_be_used_by, ["com.acme.impl"]);
        assert!(dto.ignore.is_empty());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result: Result<ConfigDto, _> = toml::from_str("[model]\ninput = [\"x\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_config() {
        let dto: ConfigDto = toml::from_str("").expect("Failed to parse");
        assert!(dto.rules.is_none());
        assert!(dto.model.inputs.is_empty());
        assert_eq!(dto.cycles.enabled, None);
    }
}

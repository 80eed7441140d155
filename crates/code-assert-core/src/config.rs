//! Analysis configuration (`code-assert.toml`).
//!
//! ```text
//! TOML text
//!   ↓ serde (dto)
//! ConfigDto
//!   ↓ validate + convert (loader)
//! AnalysisConfig
//! ```

pub mod dto;
pub mod loader;

use std::path::{Path, PathBuf};

pub use loader::LoadError;

use crate::cycles::CycleScope;
use crate::ignore::Ignore;
use crate::rules::RuleSet;
use crate::source::Language;

/// Starter configuration written by `code-assert init`.
pub const STARTER_CONFIG: &str = r#"# code-assert configuration

[model]
inputs = ["target/classes"]
ignore-packages = ["java.", "javax.", "kotlin."]
# merge-packages = ["org.junit"]
# languages = ["java", "kotlin"]
# parallelism = 4

[rules]
mode = "deny-by-default"
externals = ["java.*", "javax.*", "kotlin.*"]
allow-intra-package-cycles = false

# [[rules.package]]
# pattern = "com.example.api"
# may-use = ["com.example.model"]
# must-not-use = ["com.example.impl.*"]

[cycles]
enabled = true
scope = "packages"
allow = []

# [[ignore]]
# because = "legacy bridge, removal tracked"
# patterns = ["com.example.legacy* -> com.example.api"]
"#;

/// Everything one analysis needs, validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Model inputs and filters.
    pub model: ModelSettings,
    /// Dependency rules; `None` skips rule evaluation.
    pub rules: Option<RuleSet>,
    /// Cycle detection.
    pub cycles: CycleSettings,
    /// Ignored findings.
    pub ignores: Vec<Ignore>,
}

/// `[model]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    /// Input paths.
    pub inputs: Vec<PathBuf>,
    /// Class name prefixes to drop.
    pub ignore_packages: Vec<String>,
    /// Package prefixes to collapse.
    pub merge_packages: Vec<String>,
    /// Source languages to classify.
    pub languages: Vec<Language>,
    /// Parser threads; `None` uses the global pool.
    pub parallelism: Option<usize>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            ignore_packages: Vec::new(),
            merge_packages: Vec::new(),
            languages: Language::ALL.to_vec(),
            parallelism: None,
        }
    }
}

/// `[cycles]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSettings {
    /// Whether cycles are detected.
    pub enabled: bool,
    /// Package or class graph.
    pub scope: CycleScope,
    /// Known cyclic groups that are not reported.
    pub allow: Vec<Vec<String>>,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            scope: CycleScope::Packages,
            allow: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let dto: dto::ConfigDto = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        Ok(loader::load(dto)?)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// The configuration is well-formed but invalid.
    #[error("Invalid config: {0}")]
    Load(#[from] LoadError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ClosureMode;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert!(config.rules.is_none());
        assert!(config.cycles.enabled);
        assert_eq!(config.model.languages, Language::ALL.to_vec());
    }

    #[test]
    fn test_starter_config_is_valid() {
        let config = AnalysisConfig::parse(STARTER_CONFIG).expect("Failed to parse");
        let rules = config.rules.expect("rules section");
        assert_eq!(rules.mode(), ClosureMode::DenyByDefault);
        assert_eq!(rules.rules().len(), 3);
        assert_eq!(config.model.inputs, [PathBuf::from("target/classes")]);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[model]
inputs = ["build/classes", "lib/app.jar"]
merge-packages = ["org.junit"]
languages = ["kotlin"]

[rules]
mode = "allow-by-default"

[[rules.package]]
pattern = "com.acme.api"
must-not-use = ["com.acme.impl.*"]

[[ignore]]
because = "legacy"
patterns = ["com.acme.legacy*"]
"#;
        let config = AnalysisConfig::parse(toml).expect("Failed to parse");
        assert_eq!(config.model.inputs.len(), 2);
        assert_eq!(config.model.languages, [Language::Kotlin]);
        assert_eq!(config.ignores[0].because, "legacy");
        let rules = config.rules.expect("rules section");
        assert_eq!(rules.mode(), ClosureMode::AllowByDefault);
        assert_eq!(rules.rules()[0].uses.must_not[0].as_str(), "com.acme.impl.*");
    }

    #[test]
    fn test_missing_file() {
        let err = AnalysisConfig::from_file(Path::new("/no/such/code-assert.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let err = AnalysisConfig::parse("[model").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}

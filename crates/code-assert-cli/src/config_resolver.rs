//! Configuration file resolution with global fallback.
//!
//! Resolves the configuration file path using a deterministic priority order:
//!
//! 1. `--config` flag (explicit path)
//! 2. `{project}/code-assert.toml` or `.code-assert.toml`
//! 3. `~/.code-assert/config.toml` (global fallback)
//! 4. No config found → defaults

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use code_assert_core::AnalysisConfig;

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly specified via `--config` flag.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Loaded from the global config directory (`~/.code-assert/`).
    Global(PathBuf),
    /// No config found; defaults will be used.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Loads the configuration.
    ///
    /// Relative `model.inputs` of a project or explicit file are taken
    /// relative to the file's directory. Inputs of the global file are
    /// dropped: they cannot describe the current project.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(&self) -> Result<AnalysisConfig> {
        let Some(path) = self.path() else {
            return Ok(AnalysisConfig::default());
        };
        if matches!(self, Self::Global(_)) {
            tracing::info!("Using global config: {}", path.display());
        }
        let mut config = AnalysisConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;

        match self {
            Self::Global(_) => config.model.inputs.clear(),
            _ => {
                let base = path.parent().unwrap_or_else(|| Path::new(""));
                for input in &mut config.model.inputs {
                    if input.is_relative() {
                        *input = base.join(&*input);
                    }
                }
            }
        }
        Ok(config)
    }
}

/// Project-level config file names, checked in order.
const PROJECT_CONFIG_NAMES: &[&str] = &["code-assert.toml", ".code-assert.toml"];

/// Config file name within the global config directory.
const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Resolves the configuration file path.
///
/// See module-level docs for resolution order.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_inner(project_dir, explicit, global_config_dir())
}

/// Takes `global_dir` as a parameter so tests need no env vars.
fn resolve_inner(
    project_dir: &Path,
    explicit: Option<&Path>,
    global_dir: Option<PathBuf>,
) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    if let Some(candidate) = PROJECT_CONFIG_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|candidate| candidate.is_file())
    {
        tracing::debug!("Found project config: {}", candidate.display());
        return ConfigSource::Project(candidate);
    }

    global_dir
        .map(|dir| dir.join(GLOBAL_CONFIG_NAME))
        .filter(|candidate| candidate.is_file())
        .map_or(ConfigSource::Default, |candidate| {
            tracing::debug!("Found global config: {}", candidate.display());
            ConfigSource::Global(candidate)
        })
}

/// Returns the global config directory path.
///
/// Resolution: `$CODE_ASSERT_CONFIG_DIR` > `~/.code-assert/`
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("CODE_ASSERT_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".code-assert"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_takes_priority_and_is_not_checked() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("code-assert.toml"), "").unwrap();

        let result = resolve_inner(tmp.path(), Some(Path::new("/nonexistent.toml")), None);
        assert_eq!(
            result,
            ConfigSource::Explicit(PathBuf::from("/nonexistent.toml"))
        );
    }

    #[test]
    fn plain_name_preferred_over_dot_prefix() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".code-assert.toml"), "").unwrap();
        assert_eq!(
            resolve_inner(tmp.path(), None, None),
            ConfigSource::Project(tmp.path().join(".code-assert.toml"))
        );

        fs::write(tmp.path().join("code-assert.toml"), "").unwrap();
        assert_eq!(
            resolve_inner(tmp.path(), None, None),
            ConfigSource::Project(tmp.path().join("code-assert.toml"))
        );
    }

    #[test]
    fn global_fallback_only_without_project_config() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        let global_dir = Some(global.path().to_path_buf());
        assert_eq!(
            resolve_inner(project.path(), None, global_dir.clone()),
            ConfigSource::Default
        );

        fs::write(global.path().join("config.toml"), "").unwrap();
        assert_eq!(
            resolve_inner(project.path(), None, global_dir.clone()),
            ConfigSource::Global(global.path().join("config.toml"))
        );

        fs::write(project.path().join("code-assert.toml"), "").unwrap();
        assert!(matches!(
            resolve_inner(project.path(), None, global_dir),
            ConfigSource::Project(_)
        ));
    }

    #[test]
    fn default_loads_default_config() {
        let config = ConfigSource::Default.load().unwrap();
        assert!(config.rules.is_none());
        assert!(config.model.inputs.is_empty());
    }

    #[test]
    fn project_inputs_are_relative_to_the_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("code-assert.toml");
        fs::write(
            &path,
            "[model]\ninputs = [\"target/classes\", \"/abs/app.jar\"]\n",
        )
        .unwrap();

        let config = ConfigSource::Project(path).load().unwrap();
        assert_eq!(
            config.model.inputs,
            [tmp.path().join("target/classes"), PathBuf::from("/abs/app.jar")]
        );
    }

    #[test]
    fn global_inputs_are_dropped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[model]\ninputs = [\"somewhere\"]\n[rules]\n").unwrap();

        let config = ConfigSource::Global(path).load().unwrap();
        assert!(config.model.inputs.is_empty());
        assert!(config.rules.is_some());
    }

    #[test]
    fn invalid_config_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("code-assert.toml");
        fs::write(&path, "[rules]\nmode = \"strict\"\n").unwrap();

        let err = ConfigSource::Explicit(path.clone()).load().unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));
        assert!(format!("{err:#}").contains("rules.mode"));
    }
}

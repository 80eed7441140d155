//! Init command implementation.

use anyhow::{bail, Context, Result};
use code_assert_core::STARTER_CONFIG;
use std::path::Path;

const CONFIG_NAME: &str = "code-assert.toml";

/// Runs the init command.
pub fn run(project_dir: &Path, force: bool) -> Result<()> {
    let config_path = project_dir.join(CONFIG_NAME);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, STARTER_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {CONFIG_NAME}");
    println!("\nNext steps:");
    println!("  1. Point model.inputs at your compiled classes or jars");
    println!("  2. Declare [[rules.package]] entries for your packages");
    println!("  3. Run: code-assert check");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_assert_core::AnalysisConfig;

    #[test]
    fn writes_a_loadable_config_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        run(tmp.path(), false).unwrap();

        let path = tmp.path().join(CONFIG_NAME);
        assert!(AnalysisConfig::from_file(&path).is_ok());
        assert!(run(tmp.path(), false).is_err());
        assert!(run(tmp.path(), true).is_ok());
    }
}

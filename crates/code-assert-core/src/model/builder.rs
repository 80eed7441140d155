//! Building a [`Model`] from files, directories and archives.

use std::path::PathBuf;

use miette::Diagnostic;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::scan::{self, Parsed};
use super::{Model, PackageFilter};
use crate::classfile::DecodeError;
use crate::extract::ExtractedClass;
use crate::source::Language;

/// Errors that abort a model build.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    /// An input could not be read.
    #[error("cannot read {}: {source}", path.display())]
    #[diagnostic(code(code_assert::build::io))]
    Io {
        /// The input path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A class file named explicitly as an input is not a valid class.
    #[error("cannot decode {}: {source}", path.display())]
    #[diagnostic(
        code(code_assert::build::decode),
        help("class files found inside directories are skipped instead; name the directory to tolerate broken files")
    )]
    Decode {
        /// The class file.
        path: PathBuf,
        /// The decode failure.
        source: DecodeError,
    },

    /// An archive could not be opened.
    #[error("cannot open archive {}: {source}", path.display())]
    #[diagnostic(code(code_assert::build::archive))]
    Archive {
        /// The archive.
        path: PathBuf,
        /// The zip error.
        source: zip::result::ZipError,
    },

    /// An explicitly named file is neither a class, an archive nor an enabled source file.
    #[error("unsupported input {}", path.display())]
    #[diagnostic(
        code(code_assert::build::unsupported),
        help("inputs are directories, .class files, jar/zip/war/ear archives and .java/.kt sources")
    )]
    Unsupported {
        /// The input path.
        path: PathBuf,
    },

    /// More classes or packages than the model can index.
    #[error("too many classes to index: {count}")]
    #[diagnostic(
        code(code_assert::build::too_large),
        help("split the inputs into several smaller runs")
    )]
    TooLarge {
        /// Upper bound of classes and packages the build would create.
        count: usize,
    },

    /// The dedicated thread pool could not be created.
    #[error("cannot create thread pool: {0}")]
    #[diagnostic(code(code_assert::build::thread_pool))]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A class or archive entry left out of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// Path, or `archive!/entry` for archive members.
    pub location: String,
    /// Why it was skipped.
    pub reason: String,
}

/// The result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The assembled model.
    pub model: Model,
    /// Entries that were skipped without aborting the build.
    pub skipped: Vec<SkippedEntry>,
}

/// Builder for a [`Model`].
///
/// ```no_run
/// use code_assert_core::model::ModelBuilder;
///
/// let outcome = ModelBuilder::new()
///     .input("target/classes")
///     .ignoring_packages(["java.", "javax."])
///     .build()?;
/// println!("{} packages", outcome.model.package_count());
/// # Ok::<(), code_assert_core::model::BuildError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    inputs: Vec<PathBuf>,
    ignore: Vec<String>,
    merge: Vec<String>,
    languages: Vec<Language>,
    parallelism: Option<usize>,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            ignore: Vec::new(),
            merge: Vec::new(),
            languages: Language::ALL.to_vec(),
            parallelism: None,
        }
    }
}

impl ModelBuilder {
    /// Creates a builder with no inputs and all source languages enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input path.
    #[must_use]
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    /// Adds several input paths.
    #[must_use]
    pub fn inputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Drops classes whose names start with any of these prefixes.
    #[must_use]
    pub fn ignoring_packages<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// Collapses packages starting with any of these prefixes into one package.
    #[must_use]
    pub fn merging_packages<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merge.extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// Source languages to classify; other source files are ignored.
    #[must_use]
    pub fn languages(mut self, languages: impl IntoIterator<Item = Language>) -> Self {
        self.languages = languages.into_iter().collect();
        self
    }

    /// Parses on a dedicated pool of `threads` threads instead of the global pool.
    #[must_use]
    pub fn parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// Reads all inputs and assembles the model.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if an input is missing or unreadable, an
    /// explicitly named class file is invalid, or an archive cannot be opened.
    /// Broken entries inside archives and directories are reported in
    /// [`BuildOutcome::skipped`] instead.
    pub fn build(self) -> Result<BuildOutcome, BuildError> {
        info!("Building model from {} input(s)", self.inputs.len());
        let inputs = scan::discover(&self.inputs, &self.languages)?;

        let parse_all = || {
            inputs
                .par_iter()
                .map(scan::parse)
                .collect::<Result<Vec<Parsed>, BuildError>>()
        };
        let parsed = match self.parallelism {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?
                .install(parse_all)?,
            None => parse_all()?,
        };

        let mut classes = Vec::new();
        let mut sources = Vec::new();
        let mut skipped = Vec::new();
        for unit in parsed {
            classes.extend(unit.classes);
            sources.extend(unit.sources);
            skipped.extend(unit.skipped);
        }

        check_capacity(&classes, sources.len())?;
        let filter = PackageFilter::new(&self.ignore, &self.merge);
        let model = Model::assemble(classes, &sources, &filter);
        info!(
            "Model built: {} packages, {} classes, {} skipped",
            model.package_count(),
            model.class_count(),
            skipped.len()
        );
        Ok(BuildOutcome { model, skipped })
    }
}

/// Every model entity is an analyzed class, a reference target or the package
/// of one of those, so this sum bounds both tables.
fn check_capacity(classes: &[ExtractedClass], sources: usize) -> Result<(), BuildError> {
    let count = classes
        .iter()
        .fold(classes.len().saturating_add(sources), |n, class| {
            n.saturating_add(class.references.len())
        });
    within_index_range(count)
}

fn within_index_range(count: usize) -> Result<(), BuildError> {
    match u32::try_from(count) {
        Ok(_) => Ok(()),
        Err(_) => Err(BuildError::TooLarge { count }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = ModelBuilder::new()
            .input("a")
            .inputs(["b", "c"])
            .ignoring_packages(["java."])
            .merging_packages(vec!["org.junit".to_string()]);
        assert_eq!(builder.inputs.len(), 3);
        assert_eq!(builder.languages, Language::ALL.to_vec());
        assert_eq!(builder.parallelism, None);
    }

    #[test]
    fn test_empty_build() {
        let outcome = ModelBuilder::new().build().unwrap();
        assert_eq!(outcome.model.package_count(), 0);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_capacity_counts_reference_targets() {
        let classes = [
            ExtractedClass::new("a.A").with_reference("b.B", 3),
            ExtractedClass::new("a.C"),
        ];
        assert!(check_capacity(&classes, 1).is_ok());
        assert!(within_index_range(u32::MAX as usize).is_ok());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_capacity_rejects_unindexable_models() {
        let count = u32::MAX as usize + 1;
        let err = within_index_range(count).unwrap_err();
        assert!(matches!(err, BuildError::TooLarge { count: c } if c == count));
    }

    #[test]
    fn test_unsupported_explicit_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "x").unwrap();
        let err = ModelBuilder::new().input(&path).build().unwrap_err();
        assert!(matches!(err, BuildError::Unsupported { .. }));
    }
}

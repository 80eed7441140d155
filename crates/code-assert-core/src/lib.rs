//! # code-assert-core
//!
//! Dependency assertions for JVM codebases, based on compiled class files.
//!
//! This crate reads `.class` files (loose, in directories or inside jar/zip
//! archives) together with optional Java and Kotlin sources, and builds a
//! package/class dependency [`Model`]. The model is then checked against:
//!
//! - a declarative [`RuleSet`] of "may use / must use / must not use"
//!   relations between packages,
//! - a [`CycleDetector`] finding dependency cycles,
//! - an ignore list suppressing known findings with a recorded reason.
//!
//! [`Analyzer`] runs all of it and returns an [`AnalysisResult`].
//!
//! ## Example
//!
//! ```no_run
//! use code_assert_core::{AnalysisConfig, Analyzer, Severity};
//!
//! let config = AnalysisConfig::from_file("code-assert.toml".as_ref())?;
//! let result = Analyzer::builder().config(config).build()?.analyze()?;
//! if result.has_violations_at(Severity::Error) {
//!     panic!("{}", result.format_test_report(Severity::Error));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod types;

pub mod classfile;
pub mod config;
pub mod cycles;
pub mod extract;
pub mod ignore;
pub mod location;
pub mod model;
pub mod rules;
pub mod source;
pub mod usage;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError};
pub use config::{AnalysisConfig, ConfigError, STARTER_CONFIG};
pub use cycles::{Cycle, CycleDetector, CycleReport, CycleScope};
pub use ignore::Ignore;
pub use model::{Model, ModelBuilder};
pub use rules::{ClosureMode, RelationKind, RuleFamily, RuleSet, RuleViolation};
pub use types::{AnalysisResult, Finding, FindingKind, Severity};

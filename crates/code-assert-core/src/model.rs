//! The package/class dependency graph.
//!
//! A [`Model`] is assembled in two phases: every analyzed class is declared
//! first, then every reference is resolved either to a declared class or to
//! an explicitly created, unanalyzed stub. Packages and their `uses` sets are
//! derived from the classes afterwards. Once built, the model is immutable.
//!
//! Identifiers are assigned in name order, so iterating packages or classes
//! always yields them sorted by name.

mod builder;
mod scan;

pub use builder::{BuildError, BuildOutcome, ModelBuilder, SkippedEntry};

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::classfile::ClassKind;
use crate::extract::ExtractedClass;
use crate::source::LineCounts;

/// Package name used for classes declared without a package.
pub const UNNAMED_PACKAGE: &str = "<Unnamed Package>";

/// Index of a package in its [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(u32);

/// Index of a class in its [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl PackageId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl ClassId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A package node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Dotted name, or [`UNNAMED_PACKAGE`].
    pub name: String,
    /// Member classes, sorted by name.
    pub classes: Vec<ClassId>,
    /// Other packages used by any member class.
    pub uses: BTreeSet<PackageId>,
    /// At least one member class (or `package-info`) was read from the inputs.
    pub analyzed: bool,
    /// Annotation types declared on `package-info`.
    pub annotations: BTreeSet<String>,
    /// Aggregated sizes of the analyzed member classes.
    pub sizes: PackageSizes,
}

/// Size aggregates of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PackageSizes {
    /// Number of analyzed classes.
    pub classes: usize,
    /// Sum of bytecode lengths.
    pub code_size: u64,
    /// Sum of class-file sizes.
    pub total_size: u64,
    /// Line counts of the source files attached to member classes, each file once.
    pub lines: Option<LineCounts>,
}

/// A class node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// Binary name (`com.acme.Outer$Inner`).
    pub name: String,
    /// Owning package.
    pub package: PackageId,
    /// Read from the inputs, as opposed to a stub created for a reference.
    pub analyzed: bool,
    /// Sum of bytecode lengths.
    pub code_size: u64,
    /// Class-file size.
    pub total_size: u64,
    /// Neither abstract nor an interface.
    pub concrete: bool,
    /// Declaration kind.
    pub kind: ClassKind,
    /// The `SourceFile` attribute.
    pub source_file: Option<String>,
    /// Line counts of the associated source file.
    pub source: Option<LineCounts>,
    /// Class-level annotation types.
    pub annotations: BTreeSet<String>,
    /// Superclass name.
    pub super_class: Option<String>,
    /// Interface names.
    pub interfaces: Vec<String>,
    /// Used classes with reference counts (always at least 1).
    pub uses: BTreeMap<ClassId, u32>,
}

/// A classified source file offered to the model for association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Directory containing the file.
    pub directory: PathBuf,
    /// File name (`Foo.java`).
    pub file_name: String,
    /// Line counts.
    pub counts: LineCounts,
}

/// Which classes to drop and which packages to collapse while assembling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFilter {
    ignore: Vec<String>,
    merge: Vec<String>,
}

impl PackageFilter {
    /// Creates a filter from name prefixes. A trailing `*` on a prefix is ignored.
    #[must_use]
    pub fn new(ignore: &[String], merge: &[String]) -> Self {
        let strip = |p: &String| p.trim_end_matches('*').to_string();
        Self {
            ignore: ignore.iter().map(strip).collect(),
            merge: merge.iter().map(strip).collect(),
        }
    }

    /// Whether classes named `class` are left out of the model.
    #[must_use]
    pub fn is_ignored(&self, class: &str) -> bool {
        self.ignore.iter().any(|prefix| class.starts_with(prefix.as_str()))
    }

    /// The package a class is placed in, after merging.
    #[must_use]
    pub fn package_for(&self, class: &str) -> String {
        let package = package_name(class);
        self.merge
            .iter()
            .find(|prefix| {
                package.starts_with(prefix.as_str()) || package == prefix.trim_end_matches('.')
            })
            .map_or_else(
                || package.to_string(),
                |prefix| prefix.trim_end_matches('.').to_string(),
            )
    }
}

/// The package part of a binary class name.
#[must_use]
pub fn package_name(class: &str) -> &str {
    class.rfind('.').map_or(UNNAMED_PACKAGE, |dot| &class[..dot])
}

/// Serializable view of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    /// Package name.
    pub name: String,
    /// Whether the package was read from the inputs.
    pub analyzed: bool,
    /// Size aggregates.
    #[serde(flatten)]
    pub sizes: PackageSizes,
    /// Names of used packages.
    pub uses: Vec<String>,
}

/// The immutable dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    packages: Vec<Package>,
    classes: Vec<Class>,
    package_ids: BTreeMap<String, PackageId>,
    class_ids: BTreeMap<String, ClassId>,
}

impl Model {
    /// Assembles a model from extracted classes with no filtering and no sources.
    #[must_use]
    pub fn from_extracted(classes: impl IntoIterator<Item = ExtractedClass>) -> Self {
        Self::assemble(classes, &[], &PackageFilter::default())
    }

    /// Assembles a model.
    ///
    /// `classes` are taken in order; when a name occurs twice the first
    /// declaration wins.
    #[must_use]
    pub fn assemble(
        classes: impl IntoIterator<Item = ExtractedClass>,
        sources: &[SourceRecord],
        filter: &PackageFilter,
    ) -> Self {
        // Phase 1: declarations.
        let mut declared: BTreeMap<String, ExtractedClass> = BTreeMap::new();
        let mut package_annotations: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for class in classes {
            if filter.is_ignored(&class.name) {
                continue;
            }
            if class.is_package_info() {
                package_annotations
                    .entry(filter.package_for(&class.name))
                    .or_default()
                    .extend(class.annotations);
                continue;
            }
            if declared.contains_key(&class.name) {
                debug!(class = %class.name, "duplicate class declaration ignored");
                continue;
            }
            declared.insert(class.name.clone(), class);
        }

        // Phase 2: every declared class and every non-ignored reference target.
        let mut names: BTreeSet<&str> = declared.keys().map(String::as_str).collect();
        for class in declared.values() {
            names.extend(
                class
                    .references
                    .keys()
                    .map(String::as_str)
                    .filter(|target| !filter.is_ignored(target)),
            );
        }

        let mut package_names: BTreeSet<String> =
            names.iter().map(|name| filter.package_for(name)).collect();
        package_names.extend(package_annotations.keys().cloned());

        let package_ids: BTreeMap<String, PackageId> = package_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, PackageId(id(i))))
            .collect();
        let class_ids: BTreeMap<String, ClassId> = names
            .iter()
            .enumerate()
            .map(|(i, name)| ((*name).to_string(), ClassId(id(i))))
            .collect();

        let mut model_classes = Vec::with_capacity(class_ids.len());
        for name in class_ids.keys() {
            let package = package_ids[&filter.package_for(name)];
            let class = match declared.get(name) {
                Some(ex) => Class {
                    name: name.clone(),
                    package,
                    analyzed: true,
                    code_size: ex.code_size,
                    total_size: ex.total_size,
                    concrete: ex.concrete,
                    kind: ex.kind,
                    source_file: ex.source_file.clone(),
                    source: None,
                    annotations: ex.annotations.clone(),
                    super_class: ex.super_class.clone(),
                    interfaces: ex.interfaces.clone(),
                    uses: ex
                        .references
                        .iter()
                        .filter(|(_, &count)| count > 0)
                        .filter_map(|(target, &count)| {
                            class_ids.get(target).map(|&target| (target, count))
                        })
                        .collect(),
                },
                None => Class {
                    name: name.clone(),
                    package,
                    analyzed: false,
                    code_size: 0,
                    total_size: 0,
                    concrete: false,
                    kind: ClassKind::TopLevel,
                    source_file: None,
                    source: None,
                    annotations: BTreeSet::new(),
                    super_class: None,
                    interfaces: Vec::new(),
                    uses: BTreeMap::new(),
                },
            };
            model_classes.push(class);
        }

        let mut model = Self {
            packages: package_ids
                .keys()
                .map(|name| Package {
                    name: name.clone(),
                    classes: Vec::new(),
                    uses: BTreeSet::new(),
                    analyzed: package_annotations.contains_key(name),
                    annotations: package_annotations.get(name).cloned().unwrap_or_default(),
                    sizes: PackageSizes::default(),
                })
                .collect(),
            classes: model_classes,
            package_ids,
            class_ids,
        };

        model.attach_sources(sources);
        model.derive_packages();
        model
    }

    fn attach_sources(&mut self, sources: &[SourceRecord]) {
        if sources.is_empty() {
            return;
        }
        for class in self.classes.iter_mut().filter(|c| c.analyzed) {
            let Some(file_name) = &class.source_file else {
                continue;
            };
            let package = package_name(&class.name);
            let package_path: PathBuf = if package == UNNAMED_PACKAGE {
                PathBuf::new()
            } else {
                package.split('.').collect()
            };
            let candidates = sources.iter().filter(|s| &s.file_name == file_name);
            let matched = candidates
                .clone()
                .find(|s| s.directory.ends_with(&package_path))
                .or_else(|| candidates.clone().next());
            class.source = matched.map(|s| s.counts);
        }
    }

    fn derive_packages(&mut self) {
        for (i, class) in self.classes.iter().enumerate() {
            let package = &mut self.packages[class.package.index()];
            package.classes.push(ClassId(id(i)));
            if class.analyzed {
                package.analyzed = true;
                package.sizes.classes += 1;
                package.sizes.code_size += class.code_size;
                package.sizes.total_size += class.total_size;
            }
        }

        for package in &mut self.packages {
            let mut seen_files = BTreeSet::new();
            for &class_id in &package.classes {
                let class = &self.classes[class_id.index()];
                for target in class.uses.keys() {
                    let target_package = self.classes[target.index()].package;
                    if target_package != class.package {
                        package.uses.insert(target_package);
                    }
                }
                if let (Some(file), Some(lines)) = (&class.source_file, class.source) {
                    if seen_files.insert(file.clone()) {
                        *package.sizes.lines.get_or_insert_with(LineCounts::default) += lines;
                    }
                }
            }
        }
    }

    /// All packages, sorted by name.
    pub fn packages(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| (PackageId(id(i)), p))
    }

    /// All classes, sorted by name.
    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &Class)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (ClassId(id(i)), c))
    }

    /// Packages read from the inputs.
    pub fn own_packages(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages().filter(|(_, p)| p.analyzed)
    }

    /// Number of packages.
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Number of classes.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Looks up a package id by name.
    #[must_use]
    pub fn package_id(&self, name: &str) -> Option<PackageId> {
        self.package_ids.get(name).copied()
    }

    /// Looks up a class id by name.
    #[must_use]
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.class_ids.get(name).copied()
    }

    /// Looks up a package by name.
    #[must_use]
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.package_id(name).map(|id| &self[id])
    }

    /// Looks up a class by name.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.class_id(name).map(|id| &self[id])
    }

    /// The package owning `class`.
    #[must_use]
    pub fn package_of(&self, class: ClassId) -> &Package {
        &self[self[class].package]
    }

    /// Packages used by `package`.
    #[must_use]
    pub fn uses(&self, package: PackageId) -> &BTreeSet<PackageId> {
        &self[package].uses
    }

    /// Classes used by `class` with their reference counts.
    #[must_use]
    pub fn used_classes(&self, class: ClassId) -> &BTreeMap<ClassId, u32> {
        &self[class].uses
    }

    /// Classes of `from` that use at least one class of `to`, sorted by name.
    #[must_use]
    pub fn vias(&self, from: PackageId, to: PackageId) -> Vec<ClassId> {
        self[from]
            .classes
            .iter()
            .copied()
            .filter(|&c| self[c].uses.keys().any(|&t| self[t].package == to))
            .collect()
    }

    /// One summary per package, sorted by name.
    #[must_use]
    pub fn package_summaries(&self) -> Vec<PackageSummary> {
        self.packages
            .iter()
            .map(|p| PackageSummary {
                name: p.name.clone(),
                analyzed: p.analyzed,
                sizes: p.sizes,
                uses: p.uses.iter().map(|&u| self[u].name.clone()).collect(),
            })
            .collect()
    }
}

impl Index<PackageId> for Model {
    type Output = Package;

    fn index(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }
}

impl Index<ClassId> for Model {
    type Output = Class;

    fn index(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }
}

/// Table indices fit in `u32`; `ModelBuilder::build` rejects larger inputs.
fn id(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, refs: &[&str]) -> ExtractedClass {
        refs.iter()
            .fold(ExtractedClass::new(name), |c, r| c.with_reference(*r, 1))
    }

    fn package_uses(model: &Model, name: &str) -> Vec<String> {
        let id = model.package_id(name).unwrap();
        model.uses(id).iter().map(|&u| model[u].name.clone()).collect()
    }

    #[test]
    fn package_uses_are_projected_from_class_edges() {
        let model = Model::from_extracted([
            class("a.A1", &["a.A2", "b.B"]),
            class("a.A2", &[]),
            class("b.B", &["c.C"]),
        ]);
        assert_eq!(package_uses(&model, "a"), ["b"]);
        assert_eq!(package_uses(&model, "b"), ["c"]);
        assert!(package_uses(&model, "c").is_empty());

        // same-package edge exists at class level only
        let a1 = model.class_id("a.A1").unwrap();
        let a2 = model.class_id("a.A2").unwrap();
        assert_eq!(model.used_classes(a1).get(&a2), Some(&1));
    }

    #[test]
    fn unreferenced_targets_become_stubs() {
        let model = Model::from_extracted([class("a.A", &["java.util.List"])]);
        let list = model.class("java.util.List").unwrap();
        assert!(!list.analyzed);
        assert!(!model.package("java.util").unwrap().analyzed);
        assert!(model.package("a").unwrap().analyzed);
        assert_eq!(model.own_packages().count(), 1);
    }

    #[test]
    fn every_class_has_exactly_one_package() {
        let model = Model::from_extracted([
            class("a.A", &["b.B", "Top"]),
            class("b.B", &["a.A$Inner"]),
        ]);
        for (id, class) in model.classes() {
            let owners: Vec<_> = model
                .packages()
                .filter(|(_, p)| p.classes.contains(&id))
                .collect();
            assert_eq!(owners.len(), 1, "{}", class.name);
            assert_eq!(owners[0].0, class.package);
        }
        assert_eq!(model.package_of(model.class_id("Top").unwrap()).name, UNNAMED_PACKAGE);
        assert_eq!(model.package_of(model.class_id("a.A$Inner").unwrap()).name, "a");
    }

    #[test]
    fn first_declaration_wins() {
        let mut first = class("a.A", &["b.B"]);
        first.code_size = 10;
        let mut second = class("a.A", &["c.C"]);
        second.code_size = 99;
        let model = Model::from_extracted([first, second]);
        assert_eq!(model.class("a.A").unwrap().code_size, 10);
        assert!(model.class("c.C").is_none());
    }

    #[test]
    fn ignored_prefixes_are_dropped_entirely() {
        let filter = PackageFilter::new(&["java.".to_string()], &[]);
        let model = Model::assemble(
            [class("a.A", &["java.util.List", "b.B"]), class("java.lang.X", &[])],
            &[],
            &filter,
        );
        assert!(model.class("java.util.List").is_none());
        assert!(model.class("java.lang.X").is_none());
        assert_eq!(package_uses(&model, "a"), ["b"]);
    }

    #[test]
    fn merged_packages_collapse_but_keep_classes() {
        let filter = PackageFilter::new(&[], &["org.junit.*".to_string()]);
        let model = Model::assemble(
            [class("a.A", &["org.junit.Assert", "org.junit.rules.Rule"])],
            &[],
            &filter,
        );
        assert_eq!(package_uses(&model, "a"), ["org.junit"]);
        let junit = model.package("org.junit").unwrap();
        assert_eq!(junit.classes.len(), 2);
        assert!(model.package("org.junit.rules").is_none());
    }

    #[test]
    fn package_info_annotates_package() {
        let mut info = ExtractedClass::new("a.package-info");
        info.annotations.insert("a.Marker".to_string());
        let model = Model::from_extracted([info, class("a.A", &[])]);
        let a = model.package("a").unwrap();
        assert!(a.annotations.contains("a.Marker"));
        assert!(model.class("a.package-info").is_none());
    }

    #[test]
    fn vias_list_realizing_classes() {
        let model = Model::from_extracted([
            class("a.A1", &["b.B"]),
            class("a.A2", &[]),
            class("a.A3", &["b.B"]),
        ]);
        let vias: Vec<_> = model
            .vias(model.package_id("a").unwrap(), model.package_id("b").unwrap())
            .into_iter()
            .map(|c| model[c].name.clone())
            .collect();
        assert_eq!(vias, ["a.A1", "a.A3"]);
    }

    #[test]
    fn sources_attach_by_file_name_and_directory() {
        let mut a = class("com.acme.A", &[]);
        a.source_file = Some("A.java".to_string());
        let mut inner = class("com.acme.A$1", &[]);
        inner.source_file = Some("A.java".to_string());
        let counts = LineCounts {
            code: 5,
            comment: 1,
            blank: 2,
            total: 8,
        };
        let sources = vec![
            SourceRecord {
                directory: PathBuf::from("other/pkg"),
                file_name: "A.java".to_string(),
                counts: LineCounts::default(),
            },
            SourceRecord {
                directory: PathBuf::from("src/com/acme"),
                file_name: "A.java".to_string(),
                counts,
            },
        ];
        let model = Model::assemble([a, inner], &sources, &PackageFilter::default());
        assert_eq!(model.class("com.acme.A").unwrap().source, Some(counts));
        // one file, counted once for the package
        assert_eq!(model.package("com.acme").unwrap().sizes.lines, Some(counts));
    }

    #[test]
    fn assembly_is_order_independent() {
        let classes = vec![
            class("a.A", &["b.B"]),
            class("b.B", &["c.C"]),
            class("c.C", &["a.A"]),
        ];
        let forward = Model::from_extracted(classes.clone());
        let backward = Model::from_extracted(classes.into_iter().rev());
        assert_eq!(forward, backward);
    }
}

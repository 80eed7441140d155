//! Dependency extraction from decoded class files.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::classfile::descriptor::{class_constant_type, object_type, referenced_types};
use crate::classfile::signature::{referenced_classes, SignatureKind};
use crate::classfile::{ClassFile, ClassKind, Constant, DecodeError, Member};

/// Everything the model needs to know about one analyzed class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedClass {
    /// Binary name.
    pub name: String,
    /// Binary name of the superclass.
    pub super_class: Option<String>,
    /// Binary names of direct interfaces.
    pub interfaces: Vec<String>,
    /// Referenced classes with the number of places they are mentioned.
    pub references: BTreeMap<String, u32>,
    /// Class-level annotation types.
    pub annotations: BTreeSet<String>,
    /// The `SourceFile` attribute.
    pub source_file: Option<String>,
    /// Sum of method bytecode lengths.
    pub code_size: u64,
    /// Size of the class file.
    pub total_size: u64,
    /// Neither abstract nor an interface.
    pub concrete: bool,
    /// Declaration kind.
    pub kind: ClassKind,
}

impl ExtractedClass {
    /// Creates an empty concrete top-level class record.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            concrete: true,
            ..Self::default()
        }
    }

    /// Adds `count` references to `target`.
    #[must_use]
    pub fn with_reference(mut self, target: impl Into<String>, count: u32) -> Self {
        *self.references.entry(target.into()).or_insert(0) += count;
        self
    }

    /// `package-info` classes carry package annotations, not code.
    #[must_use]
    pub fn is_package_info(&self) -> bool {
        self.name == "package-info" || self.name.ends_with(".package-info")
    }
}

/// Derives the referenced classes of `class`.
///
/// # Errors
///
/// Returns a [`DecodeError`] when a constant referenced from the pool is of
/// the wrong kind. Malformed generic signatures are logged and skipped.
pub fn extract(class: &ClassFile) -> Result<ExtractedClass, DecodeError> {
    let mut refs = References {
        own: &class.this_class,
        counts: BTreeMap::new(),
    };
    let pool = &class.constant_pool;

    // Super types are pool `Class` entries and get counted here.
    for (_, constant) in pool.iter() {
        match constant {
            Constant::Class { name_index } => {
                if let Some(name) = class_constant_type(pool.utf8(*name_index)?) {
                    refs.add(name);
                }
            }
            Constant::MethodType { descriptor_index } => {
                refs.add_descriptor(pool.utf8(*descriptor_index)?);
            }
            other => {
                if let Some(index) = other.member_name_and_type() {
                    let (_, descriptor) = pool.name_and_type(index)?;
                    refs.add_descriptor(descriptor);
                }
            }
        }
    }

    if let Some(signature) = &class.signature {
        refs.add_signature(SignatureKind::Class, signature);
    }
    for field in &class.fields {
        refs.add_member(SignatureKind::Field, field);
    }
    for method in &class.methods {
        refs.add_member(SignatureKind::Method, method);
    }

    let mut annotations = BTreeSet::new();
    for annotation in &class.annotations {
        if let Some(name) = object_type(&annotation.type_descriptor) {
            annotations.insert(name);
        }
        annotation.for_each_type(&mut |d| refs.add_descriptor(d));
    }

    Ok(ExtractedClass {
        name: class.this_class.clone(),
        super_class: class.super_class.clone(),
        interfaces: class.interfaces.clone(),
        references: refs.counts,
        annotations,
        source_file: class.source_file.clone(),
        code_size: class.code_size(),
        total_size: u64::try_from(class.size).unwrap_or(u64::MAX),
        concrete: class.is_concrete(),
        kind: class.kind(),
    })
}

struct References<'a> {
    own: &'a str,
    counts: BTreeMap<String, u32>,
}

impl References<'_> {
    fn add(&mut self, name: String) {
        if name != self.own {
            *self.counts.entry(name).or_insert(0) += 1;
        }
    }

    fn add_descriptor(&mut self, descriptor: &str) {
        for name in referenced_types(descriptor) {
            self.add(name);
        }
    }

    fn add_signature(&mut self, kind: SignatureKind, signature: &str) {
        match referenced_classes(kind, signature) {
            Ok(names) => {
                for name in names {
                    self.add(name);
                }
            }
            Err(err) => warn!(class = self.own, "{err}"),
        }
    }

    fn add_member(&mut self, kind: SignatureKind, member: &Member) {
        self.add_descriptor(&member.descriptor);
        if let Some(signature) = &member.signature {
            self.add_signature(kind, signature);
        }
        for annotation in &member.annotations {
            annotation.for_each_type(&mut |d| self.add_descriptor(d));
        }
    }
}

//! Structural decoder for JVM class files.
//!
//! Only the parts needed for dependency analysis are kept: the constant pool,
//! the class header, member descriptors and a handful of attributes
//! (`Code`, `Signature`, `SourceFile`, annotations and `InnerClasses`).
//! Every other attribute is skipped by its declared length.
//!
//! Names exposed on [`ClassFile`] are binary names (`java.util.Map$Entry`);
//! descriptors and signatures are kept in their raw form.

mod annotation;
mod constant_pool;
pub mod descriptor;
mod reader;
pub mod signature;

pub use annotation::{Annotation, ElementValue};
pub use constant_pool::{Constant, ConstantPool};

use descriptor::to_binary_name;
use reader::ByteReader;
use serde::Serialize;

const MAGIC: u32 = 0xCAFE_BABE;

/// `ACC_INTERFACE`
pub const ACC_INTERFACE: u16 = 0x0200;
/// `ACC_ABSTRACT`
pub const ACC_ABSTRACT: u16 = 0x0400;

/// Errors raised while decoding a class file.
///
/// A decode error is fatal for the class being read; callers scanning many
/// classes record it and move on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The file does not start with `0xCAFEBABE`.
    #[error("not a class file (magic 0x{found:08X})")]
    BadMagic {
        /// The first four bytes.
        found: u32,
    },

    /// Input ended in the middle of a structure.
    #[error("truncated class file: needed {needed} bytes at offset {offset}")]
    Truncated {
        /// Offset where the read started.
        offset: usize,
        /// Number of bytes requested.
        needed: usize,
    },

    /// A constant-pool tag outside the known set.
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag {
        /// The tag byte.
        tag: u8,
        /// The pool slot being read.
        index: u16,
    },

    /// A reference to a missing constant or one of the wrong kind.
    #[error("constant pool index {index} is not a {expected} entry")]
    BadConstantIndex {
        /// The referenced slot.
        index: u16,
        /// The kind the reference requires.
        expected: &'static str,
    },

    /// An annotation element value with an unknown tag.
    #[error("unknown annotation element tag '{}'", char::from(*.tag))]
    UnknownElementTag {
        /// The tag byte.
        tag: u8,
    },

    /// Annotation values nested beyond the supported depth.
    #[error("annotation values nested too deeply")]
    NestingTooDeep,
}

/// How a class is declared relative to other classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClassKind {
    /// Declared directly in a package.
    #[default]
    TopLevel,
    /// A member of another class.
    Nested,
    /// Declared inside a method body with a name.
    Local,
    /// An anonymous class.
    Anonymous,
}

/// A field or method.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// Access flags.
    pub access_flags: u16,
    /// Simple name.
    pub name: String,
    /// Field or method descriptor.
    pub descriptor: String,
    /// Generic signature, if present.
    pub signature: Option<String>,
    /// Annotations on the member and, for methods, its parameters.
    pub annotations: Vec<Annotation>,
    /// Length of the bytecode, for methods with a `Code` attribute.
    pub code_length: Option<u32>,
}

/// One entry of the `InnerClasses` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    /// Binary name of the inner class.
    pub inner: String,
    /// Binary name of the enclosing class, absent for local and anonymous classes.
    pub outer: Option<String>,
    /// Simple name, absent for anonymous classes.
    pub name: Option<String>,
    /// Access flags as declared in source.
    pub access_flags: u16,
}

/// A decoded class file.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    /// Minor version.
    pub minor_version: u16,
    /// Major version.
    pub major_version: u16,
    /// The constant pool.
    pub constant_pool: ConstantPool,
    /// Class access flags.
    pub access_flags: u16,
    /// Binary name of this class.
    pub this_class: String,
    /// Binary name of the superclass; `None` only for `java.lang.Object` and modules.
    pub super_class: Option<String>,
    /// Binary names of directly implemented interfaces.
    pub interfaces: Vec<String>,
    /// Declared fields.
    pub fields: Vec<Member>,
    /// Declared methods.
    pub methods: Vec<Member>,
    /// Class-level generic signature.
    pub signature: Option<String>,
    /// The `SourceFile` attribute (`Foo.java`).
    pub source_file: Option<String>,
    /// Class-level annotations.
    pub annotations: Vec<Annotation>,
    /// `InnerClasses` entries.
    pub inner_classes: Vec<InnerClass>,
    /// Size of the class file in bytes.
    pub size: usize,
}

impl ClassFile {
    /// Decodes a class file.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] on a bad magic number, truncated input, an
    /// unknown constant tag or a constant reference of the wrong kind.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(data);

        let magic = reader.u32()?;
        if magic != MAGIC {
            return Err(DecodeError::BadMagic { found: magic });
        }
        let minor_version = reader.u16()?;
        let major_version = reader.u16()?;
        let constant_pool = ConstantPool::read(&mut reader)?;

        let access_flags = reader.u16()?;
        let this_class = to_binary_name(constant_pool.class_name(reader.u16()?)?);
        let super_index = reader.u16()?;
        let super_class = if super_index == 0 {
            None
        } else {
            Some(to_binary_name(constant_pool.class_name(super_index)?))
        };

        let interface_count = reader.u16()?;
        let interfaces = (0..interface_count)
            .map(|_| {
                let index = reader.u16()?;
                constant_pool.class_name(index).map(to_binary_name)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let fields = read_members(&mut reader, &constant_pool)?;
        let methods = read_members(&mut reader, &constant_pool)?;

        let mut class = Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            signature: None,
            source_file: None,
            annotations: Vec::new(),
            inner_classes: Vec::new(),
            size: data.len(),
            constant_pool,
        };

        let attribute_count = reader.u16()?;
        for _ in 0..attribute_count {
            let (name, mut body) = read_attribute(&mut reader, &class.constant_pool)?;
            let pool = &class.constant_pool;
            match name {
                "Signature" => class.signature = Some(pool.utf8(body.u16()?)?.to_string()),
                "SourceFile" => class.source_file = Some(pool.utf8(body.u16()?)?.to_string()),
                "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                    class
                        .annotations
                        .extend(annotation::read_annotations(&mut body, pool)?);
                }
                "InnerClasses" => class.inner_classes = read_inner_classes(&mut body, pool)?,
                _ => {}
            }
        }

        Ok(class)
    }

    /// Neither abstract nor an interface.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.access_flags & (ACC_INTERFACE | ACC_ABSTRACT) == 0
    }

    /// Derives the declaration kind from this class's own `InnerClasses` entry.
    #[must_use]
    pub fn kind(&self) -> ClassKind {
        let Some(entry) = self.inner_classes.iter().find(|e| e.inner == self.this_class) else {
            return ClassKind::TopLevel;
        };
        match (&entry.name, &entry.outer) {
            (None, _) => ClassKind::Anonymous,
            (Some(_), None) => ClassKind::Local,
            (Some(_), Some(_)) => ClassKind::Nested,
        }
    }

    /// Total bytecode length over all methods.
    #[must_use]
    pub fn code_size(&self) -> u64 {
        self.methods
            .iter()
            .filter_map(|m| m.code_length)
            .map(u64::from)
            .sum()
    }
}

/// Reads an attribute header and returns its name with a reader over its body.
fn read_attribute<'a, 'p>(
    reader: &mut ByteReader<'a>,
    pool: &'p ConstantPool,
) -> Result<(&'p str, ByteReader<'a>), DecodeError> {
    let name = pool.utf8(reader.u16()?)?;
    let length = reader.u32()?;
    let len = usize::try_from(length).map_err(|_| DecodeError::Truncated {
        offset: reader.offset(),
        needed: usize::MAX,
    })?;
    let body = reader.bytes(len)?;
    Ok((name, ByteReader::new(body)))
}

fn read_members(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Member>, DecodeError> {
    let count = reader.u16()?;
    let mut members = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let access_flags = reader.u16()?;
        let name = pool.utf8(reader.u16()?)?.to_string();
        let descriptor = pool.utf8(reader.u16()?)?.to_string();
        let mut member = Member {
            access_flags,
            name,
            descriptor,
            signature: None,
            annotations: Vec::new(),
            code_length: None,
        };

        let attribute_count = reader.u16()?;
        for _ in 0..attribute_count {
            let (attr, mut body) = read_attribute(reader, pool)?;
            match attr {
                "Code" => {
                    body.skip(4)?; // max_stack, max_locals
                    member.code_length = Some(body.u32()?);
                }
                "Signature" => member.signature = Some(pool.utf8(body.u16()?)?.to_string()),
                "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                    member
                        .annotations
                        .extend(annotation::read_annotations(&mut body, pool)?);
                }
                "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                    member
                        .annotations
                        .extend(annotation::read_parameter_annotations(&mut body, pool)?);
                }
                _ => {}
            }
        }
        members.push(member);
    }
    Ok(members)
}

fn read_inner_classes(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<InnerClass>, DecodeError> {
    let count = reader.u16()?;
    let mut entries = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let inner = to_binary_name(pool.class_name(reader.u16()?)?);
        let outer_index = reader.u16()?;
        let name_index = reader.u16()?;
        let access_flags = reader.u16()?;
        let outer = match outer_index {
            0 => None,
            i => Some(to_binary_name(pool.class_name(i)?)),
        };
        let name = match name_index {
            0 => None,
            i => Some(pool.utf8(i)?.to_string()),
        };
        entries.push(InnerClass {
            inner,
            outer,
            name,
            access_flags,
        });
    }
    Ok(entries)
}

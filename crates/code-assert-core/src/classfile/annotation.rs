//! `RuntimeVisibleAnnotations` / `RuntimeInvisibleAnnotations` structures.

use super::constant_pool::ConstantPool;
use super::reader::ByteReader;
use super::DecodeError;

/// Nesting limit for annotation values inside annotation values.
const MAX_DEPTH: usize = 64;

/// A decoded annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation type (`Lcom/acme/Marker;`).
    pub type_descriptor: String,
    /// Element name/value pairs in declaration order.
    pub elements: Vec<(String, ElementValue)>,
}

/// The value of an annotation element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// A primitive or string constant; `index` points into the constant pool.
    Const {
        /// One of `B C D F I J S Z s`.
        tag: u8,
        /// Constant-pool index of the value.
        index: u16,
    },
    /// An enum constant.
    Enum {
        /// Field descriptor of the enum type.
        type_descriptor: String,
        /// Name of the constant.
        const_name: String,
    },
    /// A class literal, as a return descriptor (`Ljava/lang/String;`, `V`).
    Class {
        /// The descriptor.
        descriptor: String,
    },
    /// A nested annotation.
    Annotation(Box<Annotation>),
    /// An array of values.
    Array(Vec<ElementValue>),
}

impl Annotation {
    /// Visits the descriptors of every type this annotation mentions:
    /// its own type, enum types and class literals, recursively.
    pub fn for_each_type(&self, f: &mut impl FnMut(&str)) {
        f(&self.type_descriptor);
        for (_, value) in &self.elements {
            value.for_each_type(f);
        }
    }
}

impl ElementValue {
    fn for_each_type(&self, f: &mut impl FnMut(&str)) {
        match self {
            Self::Const { .. } => {}
            Self::Enum {
                type_descriptor, ..
            } => f(type_descriptor),
            Self::Class { descriptor } => f(descriptor),
            Self::Annotation(annotation) => annotation.for_each_type(f),
            Self::Array(values) => {
                for value in values {
                    value.for_each_type(f);
                }
            }
        }
    }
}

/// Reads a `num_annotations` table.
pub(crate) fn read_annotations(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Annotation>, DecodeError> {
    let count = reader.u16()?;
    (0..count)
        .map(|_| read_annotation(reader, pool, 0))
        .collect()
}

/// Reads a `RuntimeVisibleParameterAnnotations` body, flattening all parameters.
pub(crate) fn read_parameter_annotations(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Annotation>, DecodeError> {
    let parameters = reader.u8()?;
    let mut all = Vec::new();
    for _ in 0..parameters {
        all.extend(read_annotations(reader, pool)?);
    }
    Ok(all)
}

fn read_annotation(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<Annotation, DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::NestingTooDeep);
    }
    let type_descriptor = pool.utf8(reader.u16()?)?.to_string();
    let pairs = reader.u16()?;
    let mut elements = Vec::with_capacity(usize::from(pairs));
    for _ in 0..pairs {
        let name = pool.utf8(reader.u16()?)?.to_string();
        let value = read_element_value(reader, pool, depth + 1)?;
        elements.push((name, value));
    }
    Ok(Annotation {
        type_descriptor,
        elements,
    })
}

fn read_element_value(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<ElementValue, DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::NestingTooDeep);
    }
    let tag = reader.u8()?;
    let value = match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => ElementValue::Const {
            tag,
            index: reader.u16()?,
        },
        b'e' => {
            let type_descriptor = pool.utf8(reader.u16()?)?.to_string();
            let const_name = pool.utf8(reader.u16()?)?.to_string();
            ElementValue::Enum {
                type_descriptor,
                const_name,
            }
        }
        b'c' => ElementValue::Class {
            descriptor: pool.utf8(reader.u16()?)?.to_string(),
        },
        b'@' => ElementValue::Annotation(Box::new(read_annotation(reader, pool, depth + 1)?)),
        b'[' => {
            let count = reader.u16()?;
            let values = (0..count)
                .map(|_| read_element_value(reader, pool, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            ElementValue::Array(values)
        }
        _ => return Err(DecodeError::UnknownElementTag { tag }),
    };
    Ok(value)
}

//! The class-file constant pool.

use super::reader::ByteReader;
use super::DecodeError;

/// One decoded constant-pool entry.
///
/// Long and double constants occupy two slots; the second slot holds
/// [`Constant::Unusable`], as does slot 0.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class {
        name_index: u16,
    },
    String {
        string_index: u16,
    },
    FieldRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    MethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    InterfaceMethodRef {
        class_index: u16,
        name_and_type_index: u16,
    },
    NameAndType {
        name_index: u16,
        descriptor_index: u16,
    },
    MethodHandle {
        reference_kind: u8,
        reference_index: u16,
    },
    MethodType {
        descriptor_index: u16,
    },
    Dynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    InvokeDynamic {
        bootstrap_method_attr_index: u16,
        name_and_type_index: u16,
    },
    Module {
        name_index: u16,
    },
    Package {
        name_index: u16,
    },
    Unusable,
}

impl Constant {
    /// Returns the `NameAndType` index of field, method and interface-method references.
    #[must_use]
    pub fn member_name_and_type(&self) -> Option<u16> {
        match self {
            Self::FieldRef {
                name_and_type_index,
                ..
            }
            | Self::MethodRef {
                name_and_type_index,
                ..
            }
            | Self::InterfaceMethodRef {
                name_and_type_index,
                ..
            } => Some(*name_and_type_index),
            _ => None,
        }
    }
}

/// A 1-indexed table of constants.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let count = reader.u16()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        entries.push(Constant::Unusable);

        let mut index = 1u16;
        while index < count {
            let tag = reader.u8()?;
            let constant = match tag {
                1 => {
                    let len = usize::from(reader.u16()?);
                    Constant::Utf8(decode_modified_utf8(reader.bytes(len)?))
                }
                3 => Constant::Integer(i32::from_be_bytes(reader.u32()?.to_be_bytes())),
                4 => Constant::Float(f32::from_bits(reader.u32()?)),
                5 => Constant::Long(i64::from_be_bytes(reader.u64()?.to_be_bytes())),
                6 => Constant::Double(f64::from_bits(reader.u64()?)),
                7 => Constant::Class {
                    name_index: reader.u16()?,
                },
                8 => Constant::String {
                    string_index: reader.u16()?,
                },
                9 => Constant::FieldRef {
                    class_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                10 => Constant::MethodRef {
                    class_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                11 => Constant::InterfaceMethodRef {
                    class_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                12 => Constant::NameAndType {
                    name_index: reader.u16()?,
                    descriptor_index: reader.u16()?,
                },
                15 => Constant::MethodHandle {
                    reference_kind: reader.u8()?,
                    reference_index: reader.u16()?,
                },
                16 => Constant::MethodType {
                    descriptor_index: reader.u16()?,
                },
                17 => Constant::Dynamic {
                    bootstrap_method_attr_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                18 => Constant::InvokeDynamic {
                    bootstrap_method_attr_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                19 => Constant::Module {
                    name_index: reader.u16()?,
                },
                20 => Constant::Package {
                    name_index: reader.u16()?,
                },
                _ => return Err(DecodeError::UnknownConstantTag { tag, index }),
            };

            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(constant);
            index += 1;
            if wide {
                entries.push(Constant::Unusable);
                index = index.saturating_add(1);
            }
        }

        Ok(Self { entries })
    }

    /// Number of slots, including the unused slot 0.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the pool holds no constants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Returns the constant at `index`.
    #[must_use]
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(usize::from(index))
    }

    /// Iterates over usable slots with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .filter_map(|(i, c)| u16::try_from(i).ok().map(|i| (i, c)))
    }

    /// Resolves a UTF8 constant.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::BadConstantIndex`] if the slot is missing or not UTF8.
    pub fn utf8(&self, index: u16) -> Result<&str, DecodeError> {
        match self.get(index) {
            Some(Constant::Utf8(value)) => Ok(value),
            _ => Err(DecodeError::BadConstantIndex {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Resolves a `Class` constant to its internal name (`java/lang/String`).
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::BadConstantIndex`] if the slot is not a class.
    pub fn class_name(&self, index: u16) -> Result<&str, DecodeError> {
        match self.get(index) {
            Some(Constant::Class { name_index }) => self.utf8(*name_index),
            _ => Err(DecodeError::BadConstantIndex {
                index,
                expected: "Class",
            }),
        }
    }

    /// Resolves a `NameAndType` constant to `(name, descriptor)`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::BadConstantIndex`] if the slot is not a name-and-type.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), DecodeError> {
        match self.get(index) {
            Some(Constant::NameAndType {
                name_index,
                descriptor_index,
            }) => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(DecodeError::BadConstantIndex {
                index,
                expected: "NameAndType",
            }),
        }
    }
}

/// Decodes the JVM's modified UTF-8, replacing malformed sequences.
fn decode_modified_utf8(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let (unit, width) = if b & 0x80 == 0 {
            (u16::from(b), 1)
        } else if b & 0xE0 == 0xC0 {
            match bytes.get(i + 1) {
                Some(&b2) if b2 & 0xC0 == 0x80 => {
                    ((u16::from(b & 0x1F) << 6) | u16::from(b2 & 0x3F), 2)
                }
                _ => (0xFFFD, 1),
            }
        } else if b & 0xF0 == 0xE0 {
            match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&b2), Some(&b3)) if b2 & 0xC0 == 0x80 && b3 & 0xC0 == 0x80 => (
                    (u16::from(b & 0x0F) << 12)
                        | (u16::from(b2 & 0x3F) << 6)
                        | u16::from(b3 & 0x3F),
                    3,
                ),
                _ => (0xFFFD, 1),
            }
        } else {
            (0xFFFD, 1)
        };
        units.push(unit);
        i += width;
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(count: u16, body: &[u8]) -> Result<ConstantPool, DecodeError> {
        let mut data = count.to_be_bytes().to_vec();
        data.extend_from_slice(body);
        ConstantPool::read(&mut ByteReader::new(&data))
    }

    #[test]
    fn long_takes_two_slots() {
        // #1 Long, #3 Utf8 "A", #4 Class #3
        let body = [
            5, 0, 0, 0, 0, 0, 0, 0, 42, //
            1, 0, 1, b'A', //
            7, 0, 3,
        ];
        let pool = pool(5, &body).unwrap();
        assert_eq!(pool.get(1), Some(&Constant::Long(42)));
        assert_eq!(pool.get(2), Some(&Constant::Unusable));
        assert_eq!(pool.class_name(4).unwrap(), "A");
        assert_eq!(pool.iter().count(), 3);
    }

    #[test]
    fn newer_tags_are_decoded_with_their_widths() {
        let body = [
            15, 6, 0, 2, // MethodHandle
            16, 0, 3, // MethodType
            17, 0, 0, 0, 4, // Dynamic
            18, 0, 1, 0, 4, // InvokeDynamic
            19, 0, 5, // Module
            20, 0, 5, // Package
        ];
        let pool = pool(7, &body).unwrap();
        assert_eq!(
            pool.get(1),
            Some(&Constant::MethodHandle {
                reference_kind: 6,
                reference_index: 2
            })
        );
        assert_eq!(pool.get(6), Some(&Constant::Package { name_index: 5 }));
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let err = pool(2, &[2, 0, 0]).unwrap_err();
        assert_eq!(err, DecodeError::UnknownConstantTag { tag: 2, index: 1 });
    }

    #[test]
    fn truncated_entry_is_reported() {
        let err = pool(2, &[1, 0, 10, b'a']).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { needed: 10, .. }));
    }

    #[test]
    fn wrong_kind_lookup_fails() {
        let pool = pool(2, &[1, 0, 1, b'A']).unwrap();
        assert!(pool.class_name(1).is_err());
        assert!(pool.utf8(9).is_err());
    }

    #[test]
    fn modified_utf8_null_and_supplementary() {
        assert_eq!(decode_modified_utf8(&[b'a', 0xC0, 0x80, b'b']), "a\0b");
        // U+1F600 as a surrogate pair in CESU-8 form
        let smiley = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(decode_modified_utf8(&smiley), "\u{1F600}");
        assert_eq!(decode_modified_utf8(&[0xFF]), "\u{FFFD}");
    }
}

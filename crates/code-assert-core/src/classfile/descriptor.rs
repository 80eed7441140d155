//! Field and method descriptors (`I`, `[Ljava/lang/String;`, `(IJ)V`).

/// Converts an internal name (`java/util/Map$Entry`) to a binary name
/// (`java.util.Map$Entry`).
#[must_use]
pub fn to_binary_name(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Returns every object type referenced by a field or method descriptor,
/// as binary names, in order of appearance.
///
/// Array dimensions are looked through; primitives and `void` are ignored.
/// A malformed trailing type (no terminating `;`) is dropped.
#[must_use]
pub fn referenced_types(descriptor: &str) -> Vec<String> {
    let mut types = Vec::new();
    let mut rest = descriptor;
    while let Some(start) = rest.find('L') {
        let after = &rest[start + 1..];
        let Some(end) = after.find(';') else {
            break;
        };
        types.push(to_binary_name(&after[..end]));
        rest = &after[end + 1..];
    }
    types
}

/// Resolves the name stored in a `Class` constant.
///
/// Class constants hold either an internal name or, for array classes, an
/// array descriptor (`[[Ljava/lang/String;`, `[I`). Returns the element
/// class for arrays, or `None` for arrays of primitives.
#[must_use]
pub fn class_constant_type(name: &str) -> Option<String> {
    if name.starts_with('[') {
        referenced_types(name).into_iter().next()
    } else {
        Some(to_binary_name(name))
    }
}

/// Extracts the class named by a single object field descriptor
/// (`Lcom/acme/Marker;`), as used for annotation types.
#[must_use]
pub fn object_type(descriptor: &str) -> Option<String> {
    descriptor
        .strip_prefix('L')
        .and_then(|s| s.strip_suffix(';'))
        .map(to_binary_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_with_primitive_array_and_object_return() {
        assert_eq!(
            referenced_types("([I)Ljava/util/List;"),
            vec!["java.util.List".to_string()]
        );
    }

    #[test]
    fn multiple_parameters_and_nested_arrays() {
        assert_eq!(
            referenced_types("(J[[Ljava/lang/String;ILjava/util/Map$Entry;)V"),
            vec!["java.lang.String".to_string(), "java.util.Map$Entry".to_string()]
        );
    }

    #[test]
    fn primitives_only() {
        assert!(referenced_types("(IJDZ)V").is_empty());
        assert!(referenced_types("[B").is_empty());
    }

    #[test]
    fn class_name_containing_uppercase_l() {
        assert_eq!(
            referenced_types("(Lcom/acme/Logger;LList;)V"),
            vec!["com.acme.Logger".to_string(), "List".to_string()]
        );
    }

    #[test]
    fn unterminated_type_is_dropped() {
        assert_eq!(
            referenced_types("(Ljava/lang/String;Lbroken"),
            vec!["java.lang.String".to_string()]
        );
    }

    #[test]
    fn class_constants() {
        assert_eq!(
            class_constant_type("java/lang/Object").as_deref(),
            Some("java.lang.Object")
        );
        assert_eq!(
            class_constant_type("[[Lcom/acme/Foo;").as_deref(),
            Some("com.acme.Foo")
        );
        assert_eq!(class_constant_type("[I"), None);
    }

    #[test]
    fn annotation_type_descriptor() {
        assert_eq!(
            object_type("Lcom/acme/Marker;").as_deref(),
            Some("com.acme.Marker")
        );
        assert_eq!(object_type("I"), None);
    }
}

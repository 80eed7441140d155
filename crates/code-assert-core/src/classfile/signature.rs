//! Generic signatures (JVMS 4.7.9.1).
//!
//! The parser walks the full grammar so that malformed input is reported
//! rather than half-read, but it only collects the class names it meets.
//! Type variables are not classes and are not reported.

use std::collections::BTreeSet;

const MAX_DEPTH: usize = 256;

/// Which production a signature string follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// `Signature` attribute of a class.
    Class,
    /// `Signature` attribute of a field.
    Field,
    /// `Signature` attribute of a method.
    Method,
}

/// A signature that does not follow the grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed signature {signature:?} at position {position}: expected {expected}")]
pub struct SignatureError {
    /// The full signature.
    pub signature: String,
    /// Byte position of the failure.
    pub position: usize,
    /// What the parser was looking for.
    pub expected: &'static str,
}

/// Returns the binary names of all classes mentioned in `signature`.
///
/// Nested class types (`Lpkg/Outer<TT;>.Inner;`) are reported as
/// `pkg.Outer` and `pkg.Outer$Inner`.
///
/// # Errors
///
/// Returns a [`SignatureError`] if the input does not match `kind`'s grammar
/// or has trailing characters.
pub fn referenced_classes(
    kind: SignatureKind,
    signature: &str,
) -> Result<BTreeSet<String>, SignatureError> {
    let mut parser = Parser {
        input: signature,
        pos: 0,
        depth: 0,
        classes: BTreeSet::new(),
    };
    match kind {
        SignatureKind::Class => parser.class_signature()?,
        SignatureKind::Field => parser.reference_type()?,
        SignatureKind::Method => parser.method_signature()?,
    }
    if parser.pos != signature.len() {
        return Err(parser.error("end of signature"));
    }
    Ok(parser.classes)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    classes: BTreeSet<String>,
}

impl Parser<'_> {
    fn error(&self, expected: &'static str) -> SignatureError {
        SignatureError {
            signature: self.input.to_string(),
            position: self.pos,
            expected,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> Result<(), SignatureError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn enter(&mut self) -> Result<(), SignatureError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(self.error("shallower nesting"))
        } else {
            Ok(())
        }
    }

    fn identifier(&mut self) -> Result<&str, SignatureError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'.' | b';' | b'[' | b'/' | b'<' | b'>' | b':') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("identifier"));
        }
        Ok(&self.input[start..self.pos])
    }

    fn class_signature(&mut self) -> Result<(), SignatureError> {
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        self.class_type()?;
        while self.peek().is_some() {
            self.class_type()?;
        }
        Ok(())
    }

    fn method_signature(&mut self) -> Result<(), SignatureError> {
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }
        self.expect(b'(', "'('")?;
        while self.peek() != Some(b')') {
            if self.peek().is_none() {
                return Err(self.error("')'"));
            }
            self.java_type()?;
        }
        self.pos += 1;
        if self.peek() == Some(b'V') {
            self.pos += 1;
        } else {
            self.java_type()?;
        }
        while self.peek() == Some(b'^') {
            self.pos += 1;
            match self.peek() {
                Some(b'L') => self.class_type()?,
                Some(b'T') => self.type_variable()?,
                _ => return Err(self.error("thrown class or type variable")),
            }
        }
        Ok(())
    }

    fn type_parameters(&mut self) -> Result<(), SignatureError> {
        self.expect(b'<', "'<'")?;
        loop {
            self.identifier()?;
            // class bound, possibly empty
            self.expect(b':', "':'")?;
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                self.reference_type()?;
            }
            // interface bounds
            while self.peek() == Some(b':') {
                self.pos += 1;
                self.reference_type()?;
            }
            if self.peek() == Some(b'>') {
                self.pos += 1;
                return Ok(());
            }
        }
    }

    fn java_type(&mut self) -> Result<(), SignatureError> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => {
                self.pos += 1;
                Ok(())
            }
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Result<(), SignatureError> {
        self.enter()?;
        let result = match self.peek() {
            Some(b'L') => self.class_type(),
            Some(b'T') => self.type_variable(),
            Some(b'[') => {
                self.pos += 1;
                self.java_type()
            }
            _ => Err(self.error("reference type")),
        };
        self.depth -= 1;
        result
    }

    fn type_variable(&mut self) -> Result<(), SignatureError> {
        self.expect(b'T', "'T'")?;
        self.identifier()?;
        self.expect(b';', "';'")
    }

    fn class_type(&mut self) -> Result<(), SignatureError> {
        self.expect(b'L', "'L'")?;
        let mut name = String::new();
        loop {
            name.push_str(self.identifier()?);
            if self.peek() == Some(b'/') {
                self.pos += 1;
                name.push('.');
            } else {
                break;
            }
        }
        self.classes.insert(name.clone());
        self.type_arguments()?;

        while self.peek() == Some(b'.') {
            self.pos += 1;
            name.push('$');
            name.push_str(self.identifier()?);
            self.classes.insert(name.clone());
            self.type_arguments()?;
        }
        self.expect(b';', "';'")
    }

    fn type_arguments(&mut self) -> Result<(), SignatureError> {
        if self.peek() != Some(b'<') {
            return Ok(());
        }
        self.pos += 1;
        loop {
            match self.peek() {
                Some(b'*') => self.pos += 1,
                Some(b'+' | b'-') => {
                    self.pos += 1;
                    self.reference_type()?;
                }
                _ => self.reference_type()?,
            }
            if self.peek() == Some(b'>') {
                self.pos += 1;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(kind: SignatureKind, signature: &str) -> Vec<String> {
        referenced_classes(kind, signature)
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn method_with_bounded_type_parameters() {
        let found = names(
            SignatureKind::Method,
            "<E:LBase;:LMarker;X:Ljava/lang/Object;>(LOther;)Ljava/util/List<TE;>;",
        );
        assert_eq!(
            found,
            ["Base", "Marker", "Other", "java.lang.Object", "java.util.List"]
        );
    }

    #[test]
    fn class_signature_with_interface_only_bound() {
        let found = names(
            SignatureKind::Class,
            "<T::Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;Ljava/io/Serializable;",
        );
        assert_eq!(
            found,
            ["java.io.Serializable", "java.lang.Comparable", "java.lang.Object"]
        );
    }

    #[test]
    fn wildcards_arrays_and_nested_classes() {
        let found = names(
            SignatureKind::Field,
            "Lpkg/Outer<+[Lpkg/A;>.Inner<*-Lpkg/B;>;",
        );
        assert_eq!(found, ["pkg.A", "pkg.B", "pkg.Outer", "pkg.Outer$Inner"]);
    }

    #[test]
    fn throws_clause() {
        let found = names(
            SignatureKind::Method,
            "<X:Ljava/lang/Exception;>()V^TX;^Ljava/io/IOException;",
        );
        assert_eq!(found, ["java.io.IOException", "java.lang.Exception"]);
    }

    #[test]
    fn type_variables_are_not_classes() {
        assert!(names(SignatureKind::Field, "TT;").is_empty());
    }

    #[test]
    fn malformed_input_reports_position() {
        let err = referenced_classes(SignatureKind::Field, "Ljava/util/List<").unwrap_err();
        assert_eq!(err.position, 16);
        assert_eq!(err.expected, "reference type");

        let err = referenced_classes(SignatureKind::Field, "LA;junk").unwrap_err();
        assert_eq!(err.expected, "end of signature");

        assert!(referenced_classes(SignatureKind::Method, "(I").is_err());
        assert!(referenced_classes(SignatureKind::Class, "<T>LA;").is_err());
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let signature = format!("{}I", "[".repeat(1000));
        assert!(referenced_classes(SignatureKind::Field, &signature).is_err());
    }
}

//! Method and field descriptors.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;

use super::DescriptorError;

/// Most array dimensions a JVM type may declare.
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// A JVM field type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    /// Internal class name without the `L`/`;` wrapper.
    Object(SmolStr),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Parse a complete field descriptor such as `Ljava/lang/String;`.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }
        let mut parser = Parser::new(descriptor);
        let ty = parser.field_type()?;
        if !parser.at_end() {
            return Err(DescriptorError::Trailing(descriptor.into()));
        }
        Ok(ty)
    }

    /// Local variable slots the type occupies.
    #[must_use]
    pub fn slots(&self) -> u8 {
        match self {
            Self::Long | Self::Double => 2,
            _ => 1,
        }
    }

    /// Java source spelling: `int`, `java.lang.String`, `byte[]`.
    #[must_use]
    pub fn java_name(&self) -> String {
        match self {
            Self::Object(name) => name.replace(['/', '$'], "."),
            Self::Array(inner) => format!("{}[]", inner.java_name()),
            primitive => primitive.primitive_name().to_string(),
        }
    }

    /// Unqualified spelling used in labels: `String`, `Outer.Inner`, `int[]`.
    #[must_use]
    pub fn simple_name(&self) -> String {
        match self {
            Self::Object(name) => {
                let simple = name.rsplit('/').next().unwrap_or(name);
                simple.replace('$', ".")
            }
            Self::Array(inner) => format!("{}[]", inner.simple_name()),
            primitive => primitive.primitive_name().to_string(),
        }
    }

    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::Object(name) => Some(name),
            _ => None,
        }
    }

    fn primitive_name(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::Boolean => "boolean",
            Self::Object(_) | Self::Array(_) => "",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte => f.write_str("B"),
            Self::Char => f.write_str("C"),
            Self::Double => f.write_str("D"),
            Self::Float => f.write_str("F"),
            Self::Int => f.write_str("I"),
            Self::Long => f.write_str("J"),
            Self::Short => f.write_str("S"),
            Self::Boolean => f.write_str("Z"),
            Self::Object(name) => write!(f, "L{name};"),
            Self::Array(inner) => write!(f, "[{inner}"),
        }
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    /// `None` for `void`.
    pub ret: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }
        let mut parser = Parser::new(descriptor);
        if !parser.eat('(') {
            return Err(DescriptorError::MissingParams(descriptor.into()));
        }
        let mut params = Vec::new();
        while !parser.eat(')') {
            params.push(parser.field_type()?);
        }
        let ret = if parser.eat('V') {
            None
        } else {
            Some(parser.field_type()?)
        };
        if !parser.at_end() {
            return Err(DescriptorError::Trailing(descriptor.into()));
        }
        Ok(Self { params, ret })
    }

    /// Argument slots, excluding the receiver.
    #[must_use]
    pub fn arg_slots(&self) -> u32 {
        self.params.iter().map(|param| u32::from(param.slots())).sum()
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        self.ret.is_none()
    }

    /// Comma separated simple parameter names, skipping the first `skip`.
    #[must_use]
    pub fn simple_params(&self, skip: usize) -> String {
        self.params
            .iter()
            .skip(skip)
            .map(FieldType::simple_name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for param in &self.params {
            write!(f, "{param}")?;
        }
        f.write_str(")")?;
        match &self.ret {
            Some(ret) => write!(f, "{ret}"),
            None => f.write_str("V"),
        }
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn field_type(&mut self) -> Result<FieldType, DescriptorError> {
        let mut dimensions = 0;
        while self.eat('[') {
            dimensions += 1;
            if dimensions > MAX_ARRAY_DIMENSIONS {
                return Err(DescriptorError::TooManyDimensions {
                    descriptor: self.text.into(),
                    max: MAX_ARRAY_DIMENSIONS,
                });
            }
        }
        let mut ty = self.element_type()?;
        for _ in 0..dimensions {
            ty = FieldType::Array(Box::new(ty));
        }
        Ok(ty)
    }

    fn element_type(&mut self) -> Result<FieldType, DescriptorError> {
        let Some(ch) = self.peek() else {
            return Err(DescriptorError::UnterminatedClass(self.text.into()));
        };
        let start = self.pos;
        self.pos += ch.len_utf8();
        let ty = match ch {
            'B' => FieldType::Byte,
            'C' => FieldType::Char,
            'D' => FieldType::Double,
            'F' => FieldType::Float,
            'I' => FieldType::Int,
            'J' => FieldType::Long,
            'S' => FieldType::Short,
            'Z' => FieldType::Boolean,
            'L' => {
                let rest = &self.text[self.pos..];
                let Some(end) = rest.find(';') else {
                    return Err(DescriptorError::UnterminatedClass(self.text.into()));
                };
                if end == 0 {
                    return Err(DescriptorError::UnexpectedChar {
                        descriptor: self.text.into(),
                        ch: ';',
                        pos: self.pos,
                    });
                }
                let name = SmolStr::new(&rest[..end]);
                self.pos += end + 1;
                FieldType::Object(name)
            }
            other => {
                return Err(DescriptorError::UnexpectedChar {
                    descriptor: self.text.into(),
                    ch: other,
                    pos: start,
                })
            }
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_parameters() {
        let desc = MethodDescriptor::parse("(IJLjava/lang/String;[[D)Z").unwrap();
        assert_eq!(desc.params.len(), 4);
        assert_eq!(desc.arg_slots(), 1 + 2 + 1 + 1);
        assert_eq!(desc.ret, Some(FieldType::Boolean));
        assert_eq!(desc.params[3].java_name(), "double[][]");
        assert_eq!(desc.to_string(), "(IJLjava/lang/String;[[D)Z");
    }

    #[test]
    fn simple_names_drop_packages_and_dollar_signs() {
        let desc =
            MethodDescriptor::parse("(Lcom/example/Outer$Inner;Ljava/lang/String;)V").unwrap();
        assert!(desc.is_void());
        assert_eq!(desc.simple_params(0), "Outer.Inner, String");
        assert_eq!(desc.simple_params(1), "String");
    }

    #[test]
    fn rejects_malformed_descriptors() {
        assert_eq!(MethodDescriptor::parse(""), Err(DescriptorError::Empty));
        assert!(matches!(
            MethodDescriptor::parse("I)V"),
            Err(DescriptorError::MissingParams(_))
        ));
        assert!(matches!(
            MethodDescriptor::parse("(Ljava/lang/String)V"),
            Err(DescriptorError::UnterminatedClass(_))
        ));
        assert!(matches!(
            MethodDescriptor::parse("(Q)V"),
            Err(DescriptorError::UnexpectedChar { ch: 'Q', pos: 1, .. })
        ));
        assert!(matches!(
            MethodDescriptor::parse("()VV"),
            Err(DescriptorError::Trailing(_))
        ));
        assert!(matches!(
            FieldType::parse("I;"),
            Err(DescriptorError::Trailing(_))
        ));
    }

    #[test]
    fn array_dimensions_are_capped() {
        let deepest = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS));
        let ty = FieldType::parse(&deepest).unwrap();
        assert_eq!(ty.to_string(), deepest);

        let nested = format!("({}I)V", "[".repeat(2_000_000));
        assert_eq!(
            MethodDescriptor::parse(&nested),
            Err(DescriptorError::TooManyDimensions {
                descriptor: nested.as_str().into(),
                max: MAX_ARRAY_DIMENSIONS,
            })
        );
        assert!(matches!(
            FieldType::parse("[["),
            Err(DescriptorError::UnterminatedClass(_))
        ));
    }
}

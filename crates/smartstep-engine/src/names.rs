//! Kotlin/JVM name demangling.
//!
//! Internal names use `/` between packages and `$` between nested classes.
//! User-visible names use `.` for both.

#![allow(missing_docs)]

use smartstep_bytecode::{FieldType, MethodDescriptor};

const COMPANION_SUFFIX: &str = "$Companion";
const FACADE_SUFFIX: &str = "Kt";
const MULTIFILE_PART_MARKER: &str = "Kt__";

/// `com/example/Outer$Inner` -> `com.example.Outer$Inner`, the form debuggers
/// report for loaded classes.
#[must_use]
pub fn binary_name(internal: &str) -> String {
    internal.replace('/', ".")
}

/// `com/example/Outer$Inner` -> `com.example.Outer.Inner`.
#[must_use]
pub fn dotted(internal: &str) -> String {
    internal.replace(['/', '$'], ".")
}

/// `com/example/Outer$Inner` -> `com.example`; empty for the default package.
#[must_use]
pub fn package_of(internal: &str) -> String {
    internal
        .rsplit_once('/')
        .map(|(package, _)| package.replace('/', "."))
        .unwrap_or_default()
}

/// `com/example/Outer$Inner` -> `Outer.Inner`.
#[must_use]
pub fn simple_class(internal: &str) -> String {
    let simple = internal.rsplit('/').next().unwrap_or(internal);
    simple.replace('$', ".")
}

/// Declaring class of a companion object (`a/Foo$Companion` -> `a/Foo`).
#[must_use]
pub fn companion_outer(internal: &str) -> Option<&str> {
    internal
        .strip_suffix(COMPANION_SUFFIX)
        .filter(|outer| !outer.is_empty() && !outer.ends_with('/'))
}

/// Whether the simple name follows file-facade naming (`FooKt`, `FooKt__BarKt`).
#[must_use]
pub fn is_file_facade_name(internal: &str) -> bool {
    let simple = internal.rsplit('/').next().unwrap_or(internal);
    !simple.contains('$')
        && simple.len() > FACADE_SUFFIX.len()
        && simple.ends_with(FACADE_SUFFIX)
}

/// Source file behind a facade: `a/FooKt` -> `Foo.kt`, `a/UtilsKt__StringsKt` -> `Strings.kt`.
#[must_use]
pub fn facade_source_file(internal: &str) -> Option<String> {
    if !is_file_facade_name(internal) {
        return None;
    }
    let simple = internal.rsplit('/').next().unwrap_or(internal);
    let part = simple
        .split_once(MULTIFILE_PART_MARKER)
        .map_or(simple, |(_, part)| part);
    let stem = part.strip_suffix(FACADE_SUFFIX)?;
    (!stem.is_empty()).then(|| format!("{stem}.kt"))
}

/// Compiler-generated member names: accessors for private members, default
/// argument dispatchers, lambda bodies, annotation holders.
#[must_use]
pub fn is_synthetic_member_name(name: &str) -> bool {
    name.starts_with("access$")
        || name.ends_with("$default")
        || name.contains("$lambda")
        || name.starts_with("lambda$")
        || name.ends_with("$annotations")
        || name.contains("$$")
        || name == "<clinit>"
}

/// Compiler-generated classes reached by name alone (`$$Lambda$`, `$$inlined`).
#[must_use]
pub fn is_synthetic_class_name(internal: &str) -> bool {
    internal.contains("$$")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Getter,
    Setter,
}

/// A method that looks like a property accessor by name and shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorShape {
    pub kind: AccessorKind,
    /// User-visible property name.
    pub property: String,
    /// Backing field names to probe, most likely first.
    pub field_names: Vec<String>,
    /// Field descriptor the backing field must have.
    pub value_type: String,
}

/// Recognise `getX()`, `isX()` and `setX(value)` accessor shapes.
#[must_use]
pub fn accessor_shape(name: &str, descriptor: &MethodDescriptor) -> Option<AccessorShape> {
    if let Some(rest) = name.strip_prefix("get") {
        let value = descriptor.ret.as_ref()?;
        if !descriptor.params.is_empty() || !starts_upper(rest) {
            return None;
        }
        let property = decapitalize(rest);
        return Some(AccessorShape {
            kind: AccessorKind::Getter,
            field_names: dedup(vec![property.clone(), rest.to_string()]),
            property,
            value_type: value.to_string(),
        });
    }
    if name.starts_with("is") && starts_upper(&name[2..]) {
        let value = descriptor.ret.as_ref()?;
        if !descriptor.params.is_empty() || *value != FieldType::Boolean {
            return None;
        }
        return Some(AccessorShape {
            kind: AccessorKind::Getter,
            property: name.to_string(),
            field_names: vec![name.to_string()],
            value_type: value.to_string(),
        });
    }
    if let Some(rest) = name.strip_prefix("set") {
        if !descriptor.is_void() || descriptor.params.len() != 1 || !starts_upper(rest) {
            return None;
        }
        let property = decapitalize(rest);
        let value = &descriptor.params[0];
        let mut field_names = vec![property.clone(), rest.to_string()];
        if *value == FieldType::Boolean {
            field_names.push(format!("is{rest}"));
        }
        return Some(AccessorShape {
            kind: AccessorKind::Setter,
            field_names: dedup(field_names),
            property,
            value_type: value.to_string(),
        });
    }
    None
}

fn starts_upper(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
}

fn decapitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn dedup(mut names: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(names.len());
    names.retain(|name| {
        if seen.contains(name) {
            false
        } else {
            seen.push(name.clone());
            true
        }
    });
    names
}

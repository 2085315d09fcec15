//! Class, field and method metadata.

#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::ConstantPool;

/// JVM access flags (`ACC_*`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessFlags(u16);

impl AccessFlags {
    pub const PUBLIC: Self = Self(0x0001);
    pub const PRIVATE: Self = Self(0x0002);
    pub const PROTECTED: Self = Self(0x0004);
    pub const STATIC: Self = Self(0x0008);
    pub const FINAL: Self = Self(0x0010);
    pub const SYNCHRONIZED: Self = Self(0x0020);
    pub const BRIDGE: Self = Self(0x0040);
    pub const VARARGS: Self = Self(0x0080);
    pub const NATIVE: Self = Self(0x0100);
    pub const INTERFACE: Self = Self(0x0200);
    pub const ABSTRACT: Self = Self(0x0400);
    pub const SYNTHETIC: Self = Self(0x1000);

    const NAMES: [(&'static str, Self); 12] = [
        ("public", Self::PUBLIC),
        ("private", Self::PRIVATE),
        ("protected", Self::PROTECTED),
        ("static", Self::STATIC),
        ("final", Self::FINAL),
        ("synchronized", Self::SYNCHRONIZED),
        ("bridge", Self::BRIDGE),
        ("varargs", Self::VARARGS),
        ("native", Self::NATIVE),
        ("interface", Self::INTERFACE),
        ("abstract", Self::ABSTRACT),
        ("synthetic", Self::SYNTHETIC),
    ];

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    /// Compiler generated: synthetic or bridge.
    #[must_use]
    pub fn is_generated(self) -> bool {
        self.contains(Self::SYNTHETIC) || self.contains(Self::BRIDGE)
    }

    /// Parse lowercase flag names (`["public", "static"]`).
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, SmolStr> {
        let mut flags = Self::empty();
        for name in names {
            let flag = Self::NAMES
                .iter()
                .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
                .map(|(_, flag)| *flag)
                .ok_or_else(|| SmolStr::new(name))?;
            flags = flags.union(flag);
        }
        Ok(flags)
    }
}

impl std::ops::BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect();
        write!(f, "AccessFlags({})", names.join(" | "))
    }
}

/// What the Kotlin compiler says a class is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassKind {
    /// Ordinary class, object or companion.
    #[default]
    Class,
    Interface,
    /// Holder of one file's top-level declarations (`FooKt`).
    FileFacade,
    /// `@JvmMultifileClass` facade delegating to parts.
    MultifileFacade,
    /// One file's share of a multifile facade (`FooKt__BarKt`).
    MultifilePart,
    /// Lambda, local or anonymous class body.
    Synthetic,
}

impl ClassKind {
    #[must_use]
    pub fn is_file_facade(self) -> bool {
        matches!(
            self,
            Self::FileFacade | Self::MultifileFacade | Self::MultifilePart
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: SmolStr,
    pub descriptor: SmolStr,
    pub access: AccessFlags,
}

impl FieldInfo {
    #[must_use]
    pub fn new(
        name: impl Into<SmolStr>,
        descriptor: impl Into<SmolStr>,
        access: AccessFlags,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
        }
    }
}

/// One `LineNumberTable` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineEntry {
    pub start_pc: u32,
    pub line: u32,
}

/// Offset to source line mapping of a method body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineNumberTable {
    entries: Vec<LineEntry>,
}

impl LineNumberTable {
    /// Build a table; entries may arrive in any order.
    #[must_use]
    pub fn new(mut entries: Vec<LineEntry>) -> Self {
        entries.sort_by_key(|entry| entry.start_pc);
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[LineEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Line of the entry with the greatest `start_pc` not after `offset`.
    #[must_use]
    pub fn line_at(&self, offset: u32) -> Option<u32> {
        let idx = self.entries.partition_point(|entry| entry.start_pc <= offset);
        idx.checked_sub(1).map(|idx| self.entries[idx].line)
    }

    /// Smallest and largest line mentioned by the table.
    #[must_use]
    pub fn bounds(&self) -> Option<(u32, u32)> {
        let min = self.entries.iter().map(|entry| entry.line).min()?;
        let max = self.entries.iter().map(|entry| entry.line).max()?;
        Some((min, max))
    }
}

/// Raw `Code` attribute content the provider exposes for a method.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodBody {
    pub code: Vec<u8>,
    pub lines: LineNumberTable,
    /// Optional offset to column mapping, sorted by offset.
    pub columns: Vec<(u32, u32)>,
}

impl MethodBody {
    #[must_use]
    pub fn new(code: Vec<u8>, lines: LineNumberTable) -> Self {
        Self {
            code,
            lines,
            columns: Vec::new(),
        }
    }

    /// Column of the closest column marker at or before `offset`.
    #[must_use]
    pub fn column_at(&self, offset: u32) -> Option<u32> {
        let idx = self.columns.partition_point(|(start, _)| *start <= offset);
        idx.checked_sub(1).map(|idx| self.columns[idx].1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: SmolStr,
    pub descriptor: SmolStr,
    pub access: AccessFlags,
    /// Extension receiver type recorded in Kotlin metadata (internal name).
    pub extension_receiver: Option<SmolStr>,
    /// `None` for abstract and native methods.
    pub body: Option<MethodBody>,
}

impl MethodInfo {
    #[must_use]
    pub fn new(
        name: impl Into<SmolStr>,
        descriptor: impl Into<SmolStr>,
        access: AccessFlags,
    ) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access,
            extension_receiver: None,
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_receiver(mut self, receiver: impl Into<SmolStr>) -> Self {
        self.extension_receiver = Some(receiver.into());
        self
    }
}

/// Everything the provider knows about one loaded class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// Internal name (`com/example/Foo`).
    pub name: SmolStr,
    pub kind: ClassKind,
    pub access: AccessFlags,
    pub super_name: Option<SmolStr>,
    pub interfaces: Vec<SmolStr>,
    pub source_file: Option<SmolStr>,
    pub constant_pool: ConstantPool,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
}

impl ClassInfo {
    #[must_use]
    pub fn new(name: impl Into<SmolStr>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            access: AccessFlags::PUBLIC | AccessFlags::FINAL,
            super_name: Some(SmolStr::new_inline("java/lang/Object")),
            interfaces: Vec::new(),
            source_file: None,
            constant_pool: ConstantPool::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Kotlin `object`: exactly one static `INSTANCE` field of the class's own type.
    #[must_use]
    pub fn is_singleton_object(&self) -> bool {
        let own = format!("L{};", self.name);
        let mut singletons = self
            .fields
            .iter()
            .filter(|field| field.access.is_static() && field.descriptor == own);
        matches!(
            (singletons.next(), singletons.next()),
            (Some(field), None) if field.name == "INSTANCE"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup_uses_preceding_entry() {
        let table = LineNumberTable::new(vec![
            LineEntry { start_pc: 8, line: 12 },
            LineEntry { start_pc: 0, line: 10 },
            LineEntry { start_pc: 4, line: 11 },
        ]);
        assert_eq!(table.line_at(0), Some(10));
        assert_eq!(table.line_at(5), Some(11));
        assert_eq!(table.line_at(100), Some(12));
        assert_eq!(table.bounds(), Some((10, 12)));
    }

    #[test]
    fn offsets_before_first_entry_have_no_line() {
        let table = LineNumberTable::new(vec![LineEntry { start_pc: 3, line: 7 }]);
        assert_eq!(table.line_at(2), None);
        assert_eq!(LineNumberTable::default().bounds(), None);
    }

    #[test]
    fn singleton_requires_instance_field() {
        let mut object = ClassInfo::new("a/Obj", ClassKind::Class);
        object.fields.push(FieldInfo::new(
            "INSTANCE",
            "La/Obj;",
            AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
        ));
        assert!(object.is_singleton_object());

        let mut plain = ClassInfo::new("a/Plain", ClassKind::Class);
        plain
            .fields
            .push(FieldInfo::new("INSTANCE", "La/Plain;", AccessFlags::PUBLIC));
        assert!(!plain.is_singleton_object());
    }

    #[test]
    fn access_flags_parse_names() {
        let flags = AccessFlags::from_names(["public", "STATIC"]).unwrap();
        assert!(flags.is_static());
        assert_eq!(flags.bits(), 0x0009);
        assert_eq!(AccessFlags::from_names(["sealed"]), Err(SmolStr::new("sealed")));
    }
}

//! Resolved constant pool.
//!
//! The host has already resolved symbolic references, so entries carry the
//! owner/name/descriptor strings directly instead of chains of indices.

#![allow(missing_docs)]

use serde::Serialize;
use smol_str::SmolStr;

use super::BytecodeError;

/// A resolved `Methodref`/`InterfaceMethodref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodRef {
    /// Internal owner name (`com/example/Foo$Bar`).
    pub owner: SmolStr,
    pub name: SmolStr,
    pub descriptor: SmolStr,
    /// Declared through an `InterfaceMethodref`.
    pub interface: bool,
}

impl MethodRef {
    #[must_use]
    pub fn new(
        owner: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        descriptor: impl Into<SmolStr>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
            interface: false,
        }
    }

    #[must_use]
    pub fn interface(mut self) -> Self {
        self.interface = true;
        self
    }

    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

/// A resolved `Fieldref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldRef {
    pub owner: SmolStr,
    pub name: SmolStr,
    pub descriptor: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantEntry {
    /// Second slot of a `Long`/`Double` constant, or any entry the host left out.
    Unusable,
    Utf8(SmolStr),
    Integer(i32),
    Long(i64),
    String(SmolStr),
    Class(SmolStr),
    Field(FieldRef),
    Method(MethodRef),
    InvokeDynamic { name: SmolStr, descriptor: SmolStr },
}

impl ConstantEntry {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Unusable => "unusable slot",
            Self::Utf8(_) => "Utf8",
            Self::Integer(_) => "Integer",
            Self::Long(_) => "Long",
            Self::String(_) => "String",
            Self::Class(_) => "Class",
            Self::Field(_) => "Fieldref",
            Self::Method(_) => "Methodref",
            Self::InvokeDynamic { .. } => "InvokeDynamic",
        }
    }
}

/// Constant pool with JVM indexing: index 0 is never valid.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstantPool {
    entries: Vec<ConstantEntry>,
}

impl ConstantPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of used slots, not counting the reserved slot 0.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: u16) -> Result<&ConstantEntry, BytecodeError> {
        let slot = usize::from(index)
            .checked_sub(1)
            .ok_or(BytecodeError::InvalidPoolIndex(index))?;
        self.entries
            .get(slot)
            .ok_or(BytecodeError::InvalidPoolIndex(index))
    }

    pub fn method_ref(&self, index: u16) -> Result<&MethodRef, BytecodeError> {
        match self.get(index)? {
            ConstantEntry::Method(method) => Ok(method),
            other => Err(unexpected(index, "Methodref", other)),
        }
    }

    pub fn field_ref(&self, index: u16) -> Result<&FieldRef, BytecodeError> {
        match self.get(index)? {
            ConstantEntry::Field(field) => Ok(field),
            other => Err(unexpected(index, "Fieldref", other)),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<&SmolStr, BytecodeError> {
        match self.get(index)? {
            ConstantEntry::Class(name) => Ok(name),
            other => Err(unexpected(index, "Class", other)),
        }
    }

    /// Append an entry, reusing an identical existing one.
    pub fn intern(&mut self, entry: ConstantEntry) -> Result<u16, BytecodeError> {
        if let Some(pos) = self.entries.iter().position(|existing| *existing == entry) {
            return slot_index(pos);
        }
        let wide = matches!(entry, ConstantEntry::Long(_));
        let index = slot_index(self.entries.len())?;
        self.entries.push(entry);
        if wide {
            slot_index(self.entries.len())?;
            self.entries.push(ConstantEntry::Unusable);
        }
        Ok(index)
    }

    pub fn method(&mut self, method: MethodRef) -> Result<u16, BytecodeError> {
        self.intern(ConstantEntry::Method(method))
    }

    pub fn field(&mut self, field: FieldRef) -> Result<u16, BytecodeError> {
        self.intern(ConstantEntry::Field(field))
    }

    pub fn class(&mut self, name: impl Into<SmolStr>) -> Result<u16, BytecodeError> {
        self.intern(ConstantEntry::Class(name.into()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &ConstantEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(pos, entry)| slot_index(pos).ok().map(|index| (index, entry)))
    }
}

fn slot_index(pos: usize) -> Result<u16, BytecodeError> {
    u16::try_from(pos + 1).map_err(|_| BytecodeError::PoolOverflow)
}

fn unexpected(index: u16, expected: &str, found: &ConstantEntry) -> BytecodeError {
    tracing::trace!(index, found = found.kind_name(), "constant pool kind mismatch");
    BytecodeError::UnexpectedPoolEntry {
        index,
        expected: expected.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_one_based_and_interned() {
        let mut pool = ConstantPool::new();
        let first = pool.method(MethodRef::new("a/A", "f", "()V")).unwrap();
        let again = pool.method(MethodRef::new("a/A", "f", "()V")).unwrap();
        let class = pool.class("a/A").unwrap();
        assert_eq!(first, 1);
        assert_eq!(again, 1);
        assert_eq!(class, 2);
        assert_eq!(pool.method_ref(1).unwrap().name, "f");
        assert!(pool.get(0).is_err());
    }

    #[test]
    fn long_constants_take_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.intern(ConstantEntry::Long(7)).unwrap();
        let next = pool.class("a/B").unwrap();
        assert_eq!(long, 1);
        assert_eq!(next, 3);
        assert_eq!(pool.get(2).unwrap(), &ConstantEntry::Unusable);
    }

    #[test]
    fn wrong_entry_kind_is_reported() {
        let mut pool = ConstantPool::new();
        let class = pool.class("a/A").unwrap();
        assert_eq!(
            pool.method_ref(class),
            Err(BytecodeError::UnexpectedPoolEntry {
                index: class,
                expected: "Methodref".into(),
            })
        );
    }
}

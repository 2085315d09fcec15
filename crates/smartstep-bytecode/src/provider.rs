//! Metadata provider contract and an in-memory class pool.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::{ClassInfo, MethodInfo};

/// Source of loaded class data.
///
/// Implemented by the debugger host over its own class cache. Lookups must be
/// cheap and non-blocking: resolution runs on the thread that owns the
/// suspended context.
pub trait MetadataProvider {
    /// Class data by internal name, `None` when the class is not loaded or its
    /// metadata was stripped.
    fn class_info(&self, internal_name: &str) -> Option<&ClassInfo>;

    /// Declared method of a class.
    fn method(
        &self,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Option<(&ClassInfo, &MethodInfo)> {
        let class = self.class_info(owner)?;
        let method = class.method(name, descriptor)?;
        Some((class, method))
    }

    /// Whether `class` equals `ancestor` or inherits from it.
    fn is_subtype(&self, class: &str, ancestor: &str) -> bool {
        let mut pending = vec![SmolStr::new(class)];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            if current == ancestor {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            if let Some(info) = self.class_info(&current) {
                pending.extend(info.super_name.iter().cloned());
                pending.extend(info.interfaces.iter().cloned());
            }
            seen.push(current);
        }
        false
    }
}

/// Classes kept in memory, keyed by internal name in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ClassPool {
    classes: IndexMap<SmolStr, ClassInfo>,
}

impl ClassPool {
    /// An empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a class.
    pub fn insert(&mut self, class: ClassInfo) -> Option<ClassInfo> {
        self.classes.insert(class.name.clone(), class)
    }

    /// Classes in insertion order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class was inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl MetadataProvider for ClassPool {
    fn class_info(&self, internal_name: &str) -> Option<&ClassInfo> {
        self.classes.get(internal_name)
    }
}

//! Suspended locations and line ranges.

use serde::Serialize;
use smol_str::SmolStr;

/// Where the execution-control collaborator has the thread suspended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuspendedLocation {
    /// Thread owning the suspended frame.
    pub thread_id: u64,
    /// Internal name of the frame's class.
    pub class_name: SmolStr,
    /// Frame method name.
    pub method_name: SmolStr,
    /// Frame method descriptor.
    pub descriptor: SmolStr,
    /// Bytecode offset of the current instruction.
    pub offset: u32,
    /// Source line of the current instruction.
    pub line: u32,
}

impl SuspendedLocation {
    /// Create a location for a frame.
    #[must_use]
    pub fn new(
        thread_id: u64,
        class_name: impl Into<SmolStr>,
        method_name: impl Into<SmolStr>,
        descriptor: impl Into<SmolStr>,
        offset: u32,
        line: u32,
    ) -> Self {
        Self {
            thread_id,
            class_name: class_name.into(),
            method_name: method_name.into(),
            descriptor: descriptor.into(),
            offset,
            line,
        }
    }

    /// `owner.method descriptor` for log and error messages.
    #[must_use]
    pub fn method_display(&self) -> SmolStr {
        SmolStr::new(format!(
            "{}.{}{}",
            self.class_name, self.method_name, self.descriptor
        ))
    }
}

/// Inclusive range of source lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    /// First line.
    pub start: u32,
    /// Last line, inclusive.
    pub end: u32,
}

impl LineRange {
    /// Create a range; `start > end` yields an empty range.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Range covering one line.
    #[must_use]
    pub fn single(line: u32) -> Self {
        Self::new(line, line)
    }

    /// Whether the range holds no line.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.start > self.end
    }

    /// Whether `line` lies inside the range.
    #[must_use]
    pub fn contains(self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    /// Whether both ends lie within `min..=max`.
    #[must_use]
    pub fn within(self, min: u32, max: u32) -> bool {
        !self.is_empty() && min <= self.start && self.end <= max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_range_is_never_within_bounds() {
        assert!(LineRange::new(5, 4).is_empty());
        assert!(!LineRange::new(5, 4).within(1, 10));
        assert!(LineRange::single(3).within(3, 3));
        assert!(!LineRange::new(2, 11).within(1, 10));
    }
}

//! Call instruction scanning.

use serde::Serialize;
use smartstep_bytecode::{decode_code, ClassInfo, InvokeKind, MethodInfo, MethodRef};
use smol_str::SmolStr;
use tracing::{trace, warn};

use crate::error::ResolveError;
use crate::location::LineRange;

/// One call instruction mapped to a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    /// Invoke opcode family.
    pub kind: InvokeKind,
    /// Resolved target; `None` when the constant pool entry is unusable.
    pub target: Option<MethodRef>,
    /// Constant pool index of the target.
    pub pool_index: u16,
    /// Source line from the line-number table.
    pub line: u32,
    /// Bytecode offset of the invoke.
    pub offset: u32,
    /// Source column, when the body carries a column map.
    pub column: Option<u32>,
}

impl Instruction {
    /// Internal owner name of the target, if resolved.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.target.as_ref().map(|target| target.owner.as_str())
    }

    /// Target method name, if resolved.
    #[must_use]
    pub fn method_name(&self) -> Option<&str> {
        self.target.as_ref().map(|target| target.name.as_str())
    }
}

/// Extract the call instructions of `method` whose line falls inside `lines`,
/// in bytecode offset order.
///
/// An empty result is a normal outcome: the line simply makes no calls.
pub fn scan(
    class: &ClassInfo,
    method: &MethodInfo,
    lines: LineRange,
) -> Result<Vec<Instruction>, ResolveError> {
    let method_name = SmolStr::new(format!("{}.{}{}", class.name, method.name, method.descriptor));
    let Some(body) = method.body.as_ref() else {
        return Err(ResolveError::UnresolvedMetadata(SmolStr::new(format!(
            "{method_name} has no code"
        ))));
    };
    let covered = body.lines.bounds();
    match covered {
        Some((min, max)) if lines.within(min, max) => {}
        _ => {
            let covered = covered.map_or_else(
                || SmolStr::new_inline("none"),
                |(min, max)| SmolStr::new(format!("{min}..={max}")),
            );
            return Err(ResolveError::InvalidLineRange {
                start: lines.start,
                end: lines.end,
                method: method_name,
                covered,
            });
        }
    }

    let mut calls = Vec::new();
    for insn in decode_code(&body.code)? {
        let Some(kind) = insn.invoke_kind() else {
            continue;
        };
        let Some(line) = body.lines.line_at(insn.offset) else {
            continue;
        };
        if !lines.contains(line) {
            continue;
        }
        let pool_index = insn.pool_index().unwrap_or_default();
        let target = match class.constant_pool.method_ref(pool_index) {
            Ok(target) => Some(target.clone()),
            Err(err) => {
                warn!(offset = insn.offset, %err, "unresolved call target");
                None
            }
        };
        calls.push(Instruction {
            kind,
            target,
            pool_index,
            line,
            offset: insn.offset,
            column: body.column_at(insn.offset),
        });
    }
    trace!(method = %method_name, calls = calls.len(), "scanned call instructions");
    Ok(calls)
}

#[cfg(test)]
mod tests {
    use smartstep_bytecode::{parse_listing, AccessFlags, ClassKind};

    use super::*;

    fn class_with(listing: &str) -> ClassInfo {
        let mut class = ClassInfo::new("a/Main", ClassKind::Class);
        let body = parse_listing(listing, &mut class.constant_pool).unwrap();
        class
            .methods
            .push(MethodInfo::new("run", "()V", AccessFlags::PUBLIC).with_body(body));
        class
    }

    #[test]
    fn keeps_only_calls_on_requested_lines() {
        let class = class_with(
            "line 3\ninvokestatic a/MainKt.f ()V\nline 4\ninvokestatic a/MainKt.g ()V\nreturn\n",
        );
        let calls = scan(&class, &class.methods[0], LineRange::single(4)).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method_name(), Some("g"));
        assert_eq!(calls[0].offset, 3);
    }

    #[test]
    fn line_without_calls_scans_empty() {
        let class = class_with("line 3\niconst 1\npop\nline 4\nreturn\n");
        let calls = scan(&class, &class.methods[0], LineRange::single(3)).unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn column_markers_reach_the_candidates() {
        let class = class_with(
            "line 3\ncolumn 5\ninvokestatic a/MainKt.f ()V\n\
             column 12\ninvokestatic a/MainKt.g ()V\nline 4\nreturn\n",
        );
        let calls = scan(&class, &class.methods[0], LineRange::single(3)).unwrap();
        let columns: Vec<_> = calls.iter().map(|call| call.column).collect();
        assert_eq!(columns, [Some(5), Some(12)]);

        let pool = smartstep_bytecode::ClassPool::new();
        let candidates = crate::classify::Classifier::new(&pool).classify_all(&calls);
        assert_eq!(candidates[1].column(), Some(12));
        assert_eq!(candidates[1].line(), 3);
    }

    #[test]
    fn calls_without_column_markers_have_no_column() {
        let class = class_with("line 3\ninvokestatic a/MainKt.f ()V\nreturn\n");
        let calls = scan(&class, &class.methods[0], LineRange::single(3)).unwrap();
        assert_eq!(calls[0].column, None);
    }

    #[test]
    fn abstract_method_is_unresolved() {
        let class = ClassInfo::new("a/Main", ClassKind::Class);
        let method = MethodInfo::new("run", "()V", AccessFlags::ABSTRACT);
        assert!(matches!(
            scan(&class, &method, LineRange::single(1)),
            Err(ResolveError::UnresolvedMetadata(_))
        ));
    }
}

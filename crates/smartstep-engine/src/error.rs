//! Resolution errors.

#![allow(missing_docs)]

use smartstep_bytecode::BytecodeError;
use smol_str::SmolStr;
use thiserror::Error;

use crate::pattern::PatternError;

/// Errors surfaced to the caller of a resolution.
///
/// None of these are fatal to the host: the caller is expected to offer an
/// ordinary line step instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Requested lines are empty or not covered by the method's line table.
    #[error("line range {start}..={end} is outside {method} (lines {covered})")]
    InvalidLineRange {
        start: u32,
        end: u32,
        method: SmolStr,
        covered: SmolStr,
    },

    /// Metadata needed to scan the frame is missing (stripped debug info,
    /// class not loaded).
    #[error("unresolved metadata: {0}")]
    UnresolvedMetadata(SmolStr),

    /// A filter override names a rule the catalogue does not know.
    #[error("unknown filter rule '{0}'")]
    UnknownFilterRule(SmolStr),

    /// The suspended context was resumed or terminated during resolution.
    #[error("execution context changed during resolution (generation {captured} -> {current})")]
    StaleContext { captured: u64, current: u64 },

    /// `choose` was called with an index past the candidate list.
    #[error("candidate index {index} out of range ({len} candidates)")]
    CandidateOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    #[error("malformed method body: {0}")]
    Bytecode(#[from] BytecodeError),
}

//! Candidate ordering and single-target selection.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::classify::CallCandidate;

/// Order candidates by evaluation order and collapse duplicates.
///
/// The key is `(line, offset)`; equal keys keep their scan order. Two
/// candidates with the same owner, method, descriptor and offset are one
/// logical call and only the first survives.
#[must_use]
pub fn rank(mut candidates: Vec<CallCandidate>) -> Vec<CallCandidate> {
    candidates.sort_by_key(|candidate| (candidate.line(), candidate.offset()));
    let mut seen = FxHashSet::default();
    candidates.retain(|candidate| seen.insert(candidate.dedup_key()));
    candidates
}

/// Result of picking one candidate for a plain step-into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "selection", content = "candidate", rename_all = "kebab-case")]
pub enum Selection {
    /// Candidate to step into.
    Target(CallCandidate),
    /// Nothing to step into; the caller falls back to a line step.
    NoCandidate,
}

/// First ranked candidate, or [`Selection::NoCandidate`] for an empty list.
#[must_use]
pub fn select_single(ranked: &[CallCandidate]) -> Selection {
    ranked
        .first()
        .cloned()
        .map_or(Selection::NoCandidate, Selection::Target)
}

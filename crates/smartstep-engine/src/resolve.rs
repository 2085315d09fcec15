//! Resolution entry point.
//!
//! [`Resolver::resolve`] runs scan, classify, filter, rank and translate for
//! one suspended frame. Every intermediate vector belongs to the request; the
//! resolver keeps no state between calls, so one resolver may serve several
//! suspended threads as long as each request carries its own token.

use serde::{Deserialize, Serialize};
use smartstep_bytecode::MetadataProvider;
use tracing::debug;

use crate::cancel::SuspendToken;
use crate::classify::{CallCandidate, Classifier};
use crate::error::ResolveError;
use crate::filter::{FilterConfig, FilterEngine, FilterRule, Filtered, RuleCatalog};
use crate::location::{LineRange, SuspendedLocation};
use crate::rank::{rank, select_single, Selection};
use crate::scanner::scan;
use crate::translate::{translate, StepSpec};

/// Stepping gesture being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepMode {
    /// Pick the first call the line evaluates.
    StepInto,
    /// Offer every call on the line for the user to choose.
    SmartStepInto,
}

/// One resolution request.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Suspended frame.
    pub location: SuspendedLocation,
    /// Source lines to scan, usually the frame's current line.
    pub lines: LineRange,
    /// Rule overrides for this request.
    pub filters: FilterConfig,
    pub mode: StepMode,
}

impl ResolveRequest {
    /// Request for the location's own line with default filters.
    #[must_use]
    pub fn new(location: SuspendedLocation, mode: StepMode) -> Self {
        Self {
            lines: LineRange::single(location.line),
            location,
            filters: FilterConfig::default(),
            mode,
        }
    }

    #[must_use]
    pub fn with_lines(mut self, lines: LineRange) -> Self {
        self.lines = lines;
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: FilterConfig) -> Self {
        self.filters = filters;
        self
    }
}

/// Outcome of a resolution.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Smart step-into: candidates awaiting a choice.
    Targets(SmartStepTargets),
    /// Step-into: the step to execute.
    Step(StepSpec),
    /// No call survived filtering; the caller performs a line step.
    NoCandidate,
}

/// Ranked candidates offered to the user, with what `choose` needs to build
/// a StepSpec later.
#[derive(Debug, Clone)]
pub struct SmartStepTargets {
    candidates: Vec<CallCandidate>,
    line_calls: Vec<CallCandidate>,
    filtered: Vec<Filtered>,
    rules: Vec<FilterRule>,
    token: SuspendToken,
}

impl SmartStepTargets {
    /// Candidates in the order they should be presented.
    #[must_use]
    pub fn candidates(&self) -> &[CallCandidate] {
        &self.candidates
    }

    /// Every call of the range with its filter verdict, in scan order.
    #[must_use]
    pub fn filtered(&self) -> &[Filtered] {
        &self.filtered
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Build the StepSpec for the candidate the user picked.
    ///
    /// Fails with [`ResolveError::StaleContext`] when the thread was resumed
    /// since resolution.
    pub fn choose(&self, index: usize) -> Result<StepSpec, ResolveError> {
        self.token.check()?;
        let candidate = self
            .candidates
            .get(index)
            .ok_or(ResolveError::CandidateOutOfRange {
                index,
                len: self.candidates.len(),
            })?;
        let rules: Vec<&FilterRule> = self.rules.iter().collect();
        translate(candidate, &self.line_calls, &rules)
    }
}

/// Resolves stepping requests against a metadata provider and rule catalogue.
#[derive(Debug)]
pub struct Resolver<'a, P: MetadataProvider + ?Sized> {
    provider: &'a P,
    catalog: &'a RuleCatalog,
}

impl<'a, P: MetadataProvider + ?Sized> Resolver<'a, P> {
    pub fn new(provider: &'a P, catalog: &'a RuleCatalog) -> Self {
        Self { provider, catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &RuleCatalog {
        self.catalog
    }

    /// Resolve one request.
    ///
    /// Filter overrides are validated before anything is scanned. The token
    /// is checked after scanning, after filtering, and again right before a
    /// StepSpec is built.
    pub fn resolve(
        &self,
        request: &ResolveRequest,
        token: &SuspendToken,
    ) -> Result<Resolution, ResolveError> {
        let engine = FilterEngine::new(self.catalog, &request.filters)?;
        token.check()?;

        let location = &request.location;
        let (class, method) = self
            .provider
            .method(&location.class_name, &location.method_name, &location.descriptor)
            .ok_or_else(|| ResolveError::UnresolvedMetadata(location.method_display()))?;
        let instructions = scan(class, method, request.lines)?;
        token.check()?;

        let candidates = Classifier::new(self.provider).classify_all(&instructions);
        let filtered = engine.apply(candidates);
        token.check()?;

        let line_calls = rank(filtered.iter().map(|f| f.candidate.clone()).collect());
        let kept = rank(
            filtered
                .iter()
                .filter(|f| f.is_kept())
                .map(|f| f.candidate.clone())
                .collect(),
        );
        debug!(
            location = %location.method_display(),
            calls = line_calls.len(),
            kept = kept.len(),
            mode = ?request.mode,
            "resolved step candidates"
        );

        match request.mode {
            StepMode::StepInto => match select_single(&kept) {
                Selection::Target(candidate) => {
                    token.check()?;
                    let spec = translate(&candidate, &line_calls, engine.active_rules())?;
                    Ok(Resolution::Step(spec))
                }
                Selection::NoCandidate => Ok(Resolution::NoCandidate),
            },
            StepMode::SmartStepInto if kept.is_empty() => Ok(Resolution::NoCandidate),
            StepMode::SmartStepInto => Ok(Resolution::Targets(SmartStepTargets {
                candidates: kept,
                line_calls,
                filtered,
                rules: engine.active_rules().iter().map(|&rule| rule.clone()).collect(),
                token: token.clone(),
            })),
        }
    }
}

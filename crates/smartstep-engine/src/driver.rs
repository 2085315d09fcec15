//! Step driver over an execution-control collaborator.
//!
//! The engine never suspends or resumes anything itself. [`StepDriver`]
//! resolves against the frame the collaborator reports, hands the resulting
//! [`StepSpec`] back to it, and asks for a plain line step whenever smart
//! stepping has nothing to offer.

#![allow(missing_docs)]

use serde::Serialize;
use smartstep_bytecode::MetadataProvider;
use smol_str::SmolStr;
use tracing::{debug, info};

use crate::cancel::SuspendTracker;
use crate::error::ResolveError;
use crate::filter::{FilterConfig, RuleCatalog};
use crate::location::{LineRange, SuspendedLocation};
use crate::resolve::{Resolution, ResolveRequest, Resolver, SmartStepTargets, StepMode};
use crate::translate::StepSpec;

/// What the collaborator reports after executing a StepSpec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepResult {
    /// The thread stopped at the target's entry.
    Reached,
    /// The line finished without entering the target.
    TargetUnreachable,
}

/// Host debugger operations the driver relies on.
pub trait ExecutionControl {
    /// Current frame of a suspended thread, `None` if it is not suspended.
    fn location(&self, thread_id: u64) -> Option<SuspendedLocation>;

    /// Suspension tracker of a thread.
    fn tracker(&self, thread_id: u64) -> SuspendTracker;

    /// Resume the thread until the StepSpec's target is entered.
    fn run_step(&mut self, thread_id: u64, spec: &StepSpec) -> StepResult;

    /// Ordinary step to the next line.
    fn step_line(&mut self, thread_id: u64);
}

/// Why the driver performed a line step instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    NoCandidate,
    TargetUnreachable,
}

/// Outcome of a driven step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum StepOutcome {
    ReachedTarget { label: SmolStr },
    FellBack { reason: FallbackReason },
}

/// Binds a metadata provider and an execution-control collaborator.
#[derive(Debug)]
pub struct StepDriver<'a, P: MetadataProvider + ?Sized, C> {
    provider: &'a P,
    catalog: &'a RuleCatalog,
    control: C,
}

impl<'a, P, C> StepDriver<'a, P, C>
where
    P: MetadataProvider + ?Sized,
    C: ExecutionControl,
{
    pub fn new(provider: &'a P, catalog: &'a RuleCatalog, control: C) -> Self {
        Self {
            provider,
            catalog,
            control,
        }
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn into_control(self) -> C {
        self.control
    }

    /// Step into the first call on the current line, or step over the line
    /// when there is none.
    pub fn step_into(
        &mut self,
        thread_id: u64,
        filters: FilterConfig,
        lines: Option<LineRange>,
    ) -> Result<StepOutcome, ResolveError> {
        let tracker = self.control.tracker(thread_id);
        let token = tracker.token();
        let request = self.request(thread_id, StepMode::StepInto, filters, lines)?;
        let resolution = Resolver::new(self.provider, self.catalog).resolve(&request, &token)?;
        match resolution {
            Resolution::Step(spec) => {
                token.check()?;
                Ok(self.execute(thread_id, &spec))
            }
            Resolution::Targets(_) | Resolution::NoCandidate => {
                Ok(self.fall_back(thread_id, FallbackReason::NoCandidate))
            }
        }
    }

    /// Resolve the candidates of the current line for the user to choose
    /// from.
    pub fn smart_step_into(
        &self,
        thread_id: u64,
        filters: FilterConfig,
        lines: Option<LineRange>,
    ) -> Result<Resolution, ResolveError> {
        let token = self.control.tracker(thread_id).token();
        let request = self.request(thread_id, StepMode::SmartStepInto, filters, lines)?;
        Resolver::new(self.provider, self.catalog).resolve(&request, &token)
    }

    /// Execute the user's choice from [`Self::smart_step_into`].
    pub fn finish_smart_step(
        &mut self,
        thread_id: u64,
        targets: &SmartStepTargets,
        index: usize,
    ) -> Result<StepOutcome, ResolveError> {
        let spec = targets.choose(index)?;
        Ok(self.execute(thread_id, &spec))
    }

    fn request(
        &self,
        thread_id: u64,
        mode: StepMode,
        filters: FilterConfig,
        lines: Option<LineRange>,
    ) -> Result<ResolveRequest, ResolveError> {
        let location = self.control.location(thread_id).ok_or_else(|| {
            ResolveError::UnresolvedMetadata(SmolStr::new(format!(
                "thread {thread_id} is not suspended"
            )))
        })?;
        let mut request = ResolveRequest::new(location, mode).with_filters(filters);
        if let Some(lines) = lines {
            request = request.with_lines(lines);
        }
        Ok(request)
    }

    fn execute(&mut self, thread_id: u64, spec: &StepSpec) -> StepOutcome {
        match self.control.run_step(thread_id, spec) {
            StepResult::Reached => {
                info!(thread_id, target = %spec.target().label, "stepped into target");
                StepOutcome::ReachedTarget {
                    label: spec.target().label.clone(),
                }
            }
            StepResult::TargetUnreachable => {
                self.fall_back(thread_id, FallbackReason::TargetUnreachable)
            }
        }
    }

    fn fall_back(&mut self, thread_id: u64, reason: FallbackReason) -> StepOutcome {
        debug!(thread_id, ?reason, "falling back to line step");
        self.control.step_line(thread_id);
        StepOutcome::FellBack { reason }
    }
}

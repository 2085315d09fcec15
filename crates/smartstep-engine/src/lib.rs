//! `smartstep-engine` - smart step-into target resolution for Kotlin/JVM.
//!
//! A resolution request runs five stages over one suspended frame:
//! [`scanner`] pulls the calls mapped to the current line out of the method's
//! bytecode, [`classify`] recovers the source construct behind each call,
//! [`filter`] applies the caller's exclusion rules, [`rank`] orders and
//! de-duplicates the survivors, and [`translate`] turns the chosen call into a
//! [`StepSpec`] for the execution-control collaborator.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Cooperative cancellation on resumed or terminated contexts.
pub mod cancel;
/// Call classification.
pub mod classify;
/// Filter configuration files.
pub mod config;
/// Step driver over an execution-control collaborator.
pub mod driver;
/// Resolution errors.
pub mod error;
/// Filter rules and the filter engine.
pub mod filter;
/// Suspended locations and line ranges.
pub mod location;
/// Kotlin/JVM name demangling.
pub mod names;
/// Class and method globs.
pub mod pattern;
/// Candidate ordering and single-target selection.
pub mod rank;
/// Resolution entry point.
pub mod resolve;
/// Call instruction scanning.
pub mod scanner;
/// StepSpec construction.
pub mod translate;

pub use cancel::{SuspendToken, SuspendTracker};
pub use classify::{CallCandidate, Classifier, ConstructKind, CLASS_LOADER};
pub use config::{ConfigError, FilterSettings};
pub use driver::{ExecutionControl, FallbackReason, StepDriver, StepOutcome, StepResult};
pub use error::ResolveError;
pub use filter::{
    FilterConfig, FilterEngine, FilterRule, Filtered, RuleCatalog, RulePredicate, Verdict,
};
pub use location::{LineRange, SuspendedLocation};
pub use pattern::{ClassPattern, MethodPattern, PatternError};
pub use rank::{rank, select_single, Selection};
pub use resolve::{Resolution, ResolveRequest, Resolver, SmartStepTargets, StepMode};
pub use scanner::{scan, Instruction};
pub use translate::{translate, SkipPattern, StepSpec, TargetPattern};

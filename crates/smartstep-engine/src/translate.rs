//! StepSpec construction.
//!
//! A [`StepSpec`] is the only thing handed to the execution-control
//! collaborator. It lists the frames to step through without stopping and the
//! method whose entry ends the step. Class names are binary names
//! (`a.b.Outer$Inner`), the form debuggers report for loaded classes.

use rustc_hash::FxHashSet;
use serde::Serialize;
use smartstep_bytecode::{MetadataProvider, MethodRef};
use smol_str::SmolStr;
use tracing::debug;

use crate::classify::{CallCandidate, ConstructKind};
use crate::error::ResolveError;
use crate::filter::{FilterRule, RulePredicate};
use crate::names;
use crate::pattern::{ClassPattern, MethodPattern, PatternError};

const SYNTHETIC_METHODS: &[&str] = &["access$*", "*$default", "*$lambda*", "lambda$*"];

/// Frames to step through without stopping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipPattern {
    /// Declaring class glob.
    pub class: ClassPattern,
    /// Method glob; `None` skips every method of matching classes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<MethodPattern>,
    /// Classes exempt from this pattern.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<ClassPattern>,
}

impl SkipPattern {
    /// Skip every method of classes matching `class`.
    #[must_use]
    pub fn class(class: ClassPattern) -> Self {
        Self {
            class,
            method: None,
            except: Vec::new(),
        }
    }

    /// Skip one exact method.
    pub fn exact(target: &MethodRef) -> Result<Self, PatternError> {
        Ok(Self {
            class: ClassPattern::exact(&target.owner)?,
            method: Some(MethodPattern::exact(&target.name)?),
            except: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_method(mut self, method: MethodPattern) -> Self {
        self.method = Some(method);
        self
    }

    /// Whether a frame in `class` (binary name) running `method` is skipped.
    #[must_use]
    pub fn matches(&self, class: &str, method: &str) -> bool {
        self.class.matches(class)
            && self
                .method
                .as_ref()
                .is_none_or(|pattern| pattern.matches(method))
            && !self.except.iter().any(|pattern| pattern.matches(class))
    }

    fn key(&self) -> (SmolStr, Option<SmolStr>) {
        (
            SmolStr::new(self.class.as_str()),
            self.method.as_ref().map(|method| SmolStr::new(method.as_str())),
        )
    }
}

/// The method whose entry ends the step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetPattern {
    /// Binary name of the class the call is compiled against.
    pub class: SmolStr,
    /// Method name.
    pub method: SmolStr,
    /// JVM method descriptor.
    pub descriptor: SmolStr,
    /// Virtual and interface calls may land in an override.
    pub match_subtypes: bool,
    /// Entries of the same method from this line to let pass first.
    pub ordinal: usize,
    /// Label of the chosen candidate.
    pub label: SmolStr,
    /// Source line of the call site.
    pub line: u32,
}

impl TargetPattern {
    /// Whether entering `class.method descriptor` reaches the target.
    #[must_use]
    pub fn matches<P: MetadataProvider + ?Sized>(
        &self,
        provider: &P,
        class: &str,
        method: &str,
        descriptor: &str,
    ) -> bool {
        if method != self.method || descriptor != self.descriptor {
            return false;
        }
        class == self.class
            || (self.match_subtypes
                && provider.is_subtype(&internal_name(class), &internal_name(&self.class)))
    }
}

/// A resolved stepping instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSpec {
    skip: Vec<SkipPattern>,
    target: TargetPattern,
}

impl StepSpec {
    /// Skip patterns in evaluation order.
    #[must_use]
    pub fn skip_patterns(&self) -> &[SkipPattern] {
        &self.skip
    }

    #[must_use]
    pub fn target(&self) -> &TargetPattern {
        &self.target
    }

    /// Whether a frame entered in `class` running `method` should be stepped
    /// through. The target itself is never skipped.
    #[must_use]
    pub fn should_skip(&self, class: &str, method: &str) -> bool {
        if class == self.target.class && method == self.target.method {
            return false;
        }
        self.skip.iter().any(|pattern| pattern.matches(class, method))
    }

    /// Whether entering `class.method descriptor` ends the step.
    #[must_use]
    pub fn should_stop<P: MetadataProvider + ?Sized>(
        &self,
        provider: &P,
        class: &str,
        method: &str,
        descriptor: &str,
    ) -> bool {
        self.target.matches(provider, class, method, descriptor)
    }
}

/// Build the StepSpec for `chosen`.
///
/// `line_calls` are every ranked call of the scanned range, filtered or not:
/// the other calls become exact skips, and earlier calls of the same method
/// set the target's ordinal. Active rules contribute their class and method
/// globs.
pub fn translate(
    chosen: &CallCandidate,
    line_calls: &[CallCandidate],
    rules: &[&FilterRule],
) -> Result<StepSpec, ResolveError> {
    let Some(target) = chosen.target() else {
        return Err(ResolveError::UnresolvedMetadata(SmolStr::new(format!(
            "call target at offset {} is not resolvable",
            chosen.offset()
        ))));
    };

    let mut skip = Vec::new();
    for call in line_calls {
        if call.same_target(chosen) {
            continue;
        }
        if let Some(other) = call.target() {
            skip.push(SkipPattern::exact(other)?);
        }
    }
    for rule in rules {
        skip.extend(rule_skip_patterns(rule)?);
    }
    let mut seen = FxHashSet::default();
    skip.retain(|pattern| seen.insert(pattern.key()));

    let ordinal = line_calls
        .iter()
        .filter(|call| call.offset() < chosen.offset() && call.same_target(chosen))
        .count();
    let match_subtypes = chosen.instruction().kind.is_dynamic_dispatch()
        && chosen.kind() != ConstructKind::Constructor;

    let spec = StepSpec {
        skip,
        target: TargetPattern {
            class: names::binary_name(&target.owner).into(),
            method: target.name.clone(),
            descriptor: target.descriptor.clone(),
            match_subtypes,
            ordinal,
            label: SmolStr::new(chosen.label()),
            line: chosen.line(),
        },
    };
    debug!(
        target = chosen.label(),
        skips = spec.skip.len(),
        ordinal,
        "built step spec"
    );
    Ok(spec)
}

/// Patterns a rule contributes to a StepSpec. Predicates with no class or
/// method shape contribute nothing.
pub fn rule_skip_patterns(rule: &FilterRule) -> Result<Vec<SkipPattern>, PatternError> {
    let any_class = || ClassPattern::new("*");
    let mut patterns = Vec::new();
    match &rule.predicate {
        RulePredicate::Kinds(kinds) => {
            for kind in kinds {
                match kind {
                    ConstructKind::Constructor => {
                        let method = MethodPattern::exact("<init>")?;
                        patterns.push(SkipPattern::class(any_class()?).with_method(method));
                    }
                    ConstructKind::Synthetic => {
                        for method in SYNTHETIC_METHODS {
                            patterns.push(
                                SkipPattern::class(any_class()?)
                                    .with_method(MethodPattern::new(method)?),
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
        RulePredicate::Classes(classes) | RulePredicate::ClassLoaders(classes) => {
            patterns.extend(classes.iter().cloned().map(SkipPattern::class));
        }
        RulePredicate::Packages { prefixes, except } => {
            for prefix in prefixes {
                let glob = if prefix.ends_with('.') {
                    format!("{prefix}*")
                } else {
                    format!("{prefix}.*")
                };
                let mut pattern = SkipPattern::class(ClassPattern::new(&glob)?);
                pattern.except.clone_from(except);
                patterns.push(pattern);
            }
        }
        RulePredicate::Methods {
            classes, methods, ..
        } => {
            let classes = if classes.is_empty() {
                vec![any_class()?]
            } else {
                classes.clone()
            };
            for class in classes {
                if methods.is_empty() {
                    patterns.push(SkipPattern::class(class));
                } else {
                    for method in methods {
                        let pattern = SkipPattern::class(class.clone()).with_method(method.clone());
                        patterns.push(pattern);
                    }
                }
            }
        }
        RulePredicate::Custom(_) => {}
    }
    Ok(patterns)
}

fn internal_name(binary: &str) -> String {
    binary.replace('.', "/")
}

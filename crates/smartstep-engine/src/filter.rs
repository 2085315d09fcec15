//! Filter rules and the filter engine.
//!
//! Rules are data: a name, a default, and a predicate describing which
//! candidates the rule excludes. A [`RuleCatalog`] holds every rule the caller
//! knows about; a [`FilterConfig`] carries the per-request overrides. The
//! engine drops a candidate when any active rule matches it, so the order in
//! which rules are evaluated never changes the outcome.

#![allow(missing_docs)]

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use smol_str::SmolStr;
use tracing::debug;

use crate::classify::{CallCandidate, ConstructKind};
use crate::error::ResolveError;
use crate::pattern::{ClassPattern, MethodPattern, PatternError};

pub const SKIP_CONSTRUCTORS: &str = "skip-constructors";
pub const SKIP_CLASSLOADERS: &str = "skip-classloaders";
pub const SKIP_SYNTHETIC: &str = "skip-synthetic";
pub const SKIP_LIBRARY: &str = "skip-library";
pub const SKIP_RUNTIME_INTRINSICS: &str = "skip-runtime-intrinsics";
pub const SKIP_GETTERS: &str = "skip-getters";

/// Packages treated as library code unless configured otherwise.
pub const DEFAULT_LIBRARY_PREFIXES: &[&str] =
    &["java.", "javax.", "sun.", "jdk.", "kotlin.", "com.sun."];

const CLASSLOADER_CLASSES: &[&str] = &[
    "java.lang.ClassLoader",
    "*ClassLoader",
    "*ClassLoader$*",
    "sun.misc.Launcher*",
    "jdk.internal.loader.*",
];

const RUNTIME_INTRINSICS: &[&str] = &["kotlin.jvm.internal.*"];

/// Predicate over a candidate: `true` means the rule excludes it.
#[derive(Clone)]
pub enum RulePredicate {
    /// Candidates of any listed kind.
    Kinds(Vec<ConstructKind>),
    /// Candidates whose declaring class matches any glob.
    Classes(Vec<ClassPattern>),
    /// Calls into `java.lang.ClassLoader` or any loaded subclass of it, plus
    /// classes matching a glob.
    ClassLoaders(Vec<ClassPattern>),
    /// Candidates declared in any listed package, unless the class matches an
    /// `except` glob.
    Packages {
        prefixes: Vec<SmolStr>,
        except: Vec<ClassPattern>,
    },
    /// Candidates matching every non-empty list.
    Methods {
        classes: Vec<ClassPattern>,
        methods: Vec<MethodPattern>,
        kinds: Vec<ConstructKind>,
    },
    /// Host-supplied predicate.
    Custom(Arc<dyn Fn(&CallCandidate) -> bool + Send + Sync>),
}

impl RulePredicate {
    /// Whether the predicate excludes `candidate`.
    #[must_use]
    pub fn matches(&self, candidate: &CallCandidate) -> bool {
        match self {
            Self::Kinds(kinds) => kinds.contains(&candidate.kind()),
            Self::Classes(classes) => {
                let class = candidate.declaring_class();
                !class.is_empty() && classes.iter().any(|pattern| pattern.matches(&class))
            }
            Self::ClassLoaders(classes) => {
                let class = candidate.declaring_class();
                candidate.is_class_loader()
                    || (!class.is_empty() && classes.iter().any(|pattern| pattern.matches(&class)))
            }
            Self::Packages { prefixes, except } => {
                let class = candidate.declaring_class();
                !class.is_empty()
                    && prefixes.iter().any(|prefix| in_package(&class, prefix))
                    && !except.iter().any(|pattern| pattern.matches(&class))
            }
            Self::Methods {
                classes,
                methods,
                kinds,
            } => {
                let Some(target) = candidate.target() else {
                    return false;
                };
                let class = candidate.declaring_class();
                (classes.is_empty() || classes.iter().any(|pattern| pattern.matches(&class)))
                    && (methods.is_empty()
                        || methods.iter().any(|pattern| pattern.matches(&target.name)))
                    && (kinds.is_empty() || kinds.contains(&candidate.kind()))
            }
            Self::Custom(predicate) => predicate(candidate),
        }
    }
}

impl fmt::Debug for RulePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kinds(kinds) => f.debug_tuple("Kinds").field(kinds).finish(),
            Self::Classes(classes) => f.debug_tuple("Classes").field(classes).finish(),
            Self::ClassLoaders(classes) => f.debug_tuple("ClassLoaders").field(classes).finish(),
            Self::Packages { prefixes, except } => f
                .debug_struct("Packages")
                .field("prefixes", prefixes)
                .field("except", except)
                .finish(),
            Self::Methods {
                classes,
                methods,
                kinds,
            } => f
                .debug_struct("Methods")
                .field("classes", classes)
                .field("methods", methods)
                .field("kinds", kinds)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

/// `java.` matches `java.lang.String`; `java` matches `java` and `java.*`.
fn in_package(class: &str, prefix: &str) -> bool {
    if prefix.ends_with('.') {
        class.starts_with(prefix)
    } else {
        class
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }
}

/// A named exclusion rule.
#[derive(Debug, Clone)]
pub struct FilterRule {
    pub name: SmolStr,
    pub description: SmolStr,
    pub default_enabled: bool,
    pub predicate: RulePredicate,
}

impl FilterRule {
    #[must_use]
    pub fn new(
        name: impl Into<SmolStr>,
        description: impl Into<SmolStr>,
        default_enabled: bool,
        predicate: RulePredicate,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default_enabled,
            predicate,
        }
    }

    /// Library rule over `prefixes`, with `step_into` globs exempted.
    pub fn library<P, S>(prefixes: P, step_into: S) -> Result<Self, PatternError>
    where
        P: IntoIterator,
        P::Item: Into<SmolStr>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let except = step_into
            .into_iter()
            .map(|glob| ClassPattern::new(glob.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(
            SKIP_LIBRARY,
            "Skip standard library and JDK code",
            true,
            RulePredicate::Packages {
                prefixes: prefixes.into_iter().map(Into::into).collect(),
                except,
            },
        ))
    }
}

/// Every rule the caller knows about, keyed by name in insertion order.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: IndexMap<SmolStr, FilterRule>,
}

impl RuleCatalog {
    /// Empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in rules with their default library prefixes.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(FilterRule::new(
            SKIP_CONSTRUCTORS,
            "Skip constructor calls",
            true,
            RulePredicate::Kinds(vec![ConstructKind::Constructor]),
        ));
        catalog.insert(FilterRule::new(
            SKIP_CLASSLOADERS,
            "Skip class loading machinery",
            true,
            RulePredicate::ClassLoaders(builtin_patterns(CLASSLOADER_CLASSES)),
        ));
        catalog.insert(FilterRule::new(
            SKIP_SYNTHETIC,
            "Skip synthetic, bridge and default-argument methods",
            true,
            RulePredicate::Kinds(vec![ConstructKind::Synthetic]),
        ));
        catalog.insert(FilterRule::new(
            SKIP_LIBRARY,
            "Skip standard library and JDK code",
            true,
            RulePredicate::Packages {
                prefixes: DEFAULT_LIBRARY_PREFIXES
                    .iter()
                    .copied()
                    .map(SmolStr::new_static)
                    .collect(),
                except: Vec::new(),
            },
        ));
        catalog.insert(FilterRule::new(
            SKIP_RUNTIME_INTRINSICS,
            "Skip Kotlin runtime null checks",
            true,
            RulePredicate::Classes(builtin_patterns(RUNTIME_INTRINSICS)),
        ));
        catalog.insert(FilterRule::new(
            SKIP_GETTERS,
            "Skip simple property getters",
            false,
            RulePredicate::Kinds(vec![ConstructKind::PropertyGetter]),
        ));
        catalog
    }

    /// Add a rule, replacing (in place) any rule with the same name.
    pub fn insert(&mut self, rule: FilterRule) -> Option<FilterRule> {
        self.rules.insert(rule.name.clone(), rule)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FilterRule> {
        self.rules.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn rules(&self) -> impl Iterator<Item = &FilterRule> {
        self.rules.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn builtin_patterns(globs: &[&str]) -> Vec<ClassPattern> {
    globs
        .iter()
        .filter_map(|glob| ClassPattern::new(glob).ok())
        .collect()
}

/// Per-request rule overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    overrides: IndexMap<SmolStr, bool>,
    force_include: Vec<u32>,
}

impl FilterConfig {
    /// Catalogue defaults, no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn a rule on for this request.
    #[must_use]
    pub fn enable(mut self, rule: impl Into<SmolStr>) -> Self {
        self.set(rule, true);
        self
    }

    /// Turn a rule off for this request.
    #[must_use]
    pub fn disable(mut self, rule: impl Into<SmolStr>) -> Self {
        self.set(rule, false);
        self
    }

    /// Exempt the call at `offset` from every rule.
    #[must_use]
    pub fn include_offset(mut self, offset: u32) -> Self {
        if !self.force_include.contains(&offset) {
            self.force_include.push(offset);
        }
        self
    }

    /// Set an override; a later setting for the same rule wins.
    pub fn set(&mut self, rule: impl Into<SmolStr>, enabled: bool) {
        self.overrides.insert(rule.into(), enabled);
    }

    pub fn overrides(&self) -> impl Iterator<Item = (&str, bool)> {
        self.overrides
            .iter()
            .map(|(name, enabled)| (name.as_str(), *enabled))
    }

    #[must_use]
    pub fn is_forced(&self, offset: u32) -> bool {
        self.force_include.contains(&offset)
    }

    /// Reject overrides naming rules the catalogue does not know.
    pub fn validate(&self, catalog: &RuleCatalog) -> Result<(), ResolveError> {
        match self.overrides.keys().find(|name| !catalog.contains(name)) {
            Some(name) => Err(ResolveError::UnknownFilterRule(name.clone())),
            None => Ok(()),
        }
    }

    /// Whether `rule` is active after overrides.
    #[must_use]
    pub fn is_enabled(&self, rule: &FilterRule) -> bool {
        self.overrides
            .get(&rule.name)
            .copied()
            .unwrap_or(rule.default_enabled)
    }
}

/// Outcome of filtering one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum Verdict {
    Kept,
    Dropped { rule: SmolStr },
}

/// A candidate annotated with its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filtered {
    pub candidate: CallCandidate,
    #[serde(flatten)]
    pub verdict: Verdict,
}

impl Filtered {
    #[must_use]
    pub fn is_kept(&self) -> bool {
        self.verdict == Verdict::Kept
    }
}

/// Active rules for one request.
#[derive(Debug, Clone)]
pub struct FilterEngine<'c> {
    rules: Vec<&'c FilterRule>,
    force_include: Vec<u32>,
}

impl<'c> FilterEngine<'c> {
    /// Resolve `config` against `catalog`.
    pub fn new(catalog: &'c RuleCatalog, config: &FilterConfig) -> Result<Self, ResolveError> {
        config.validate(catalog)?;
        let rules = catalog
            .rules()
            .filter(|rule| config.is_enabled(rule))
            .collect();
        Ok(Self {
            rules,
            force_include: config.force_include.clone(),
        })
    }

    /// Rules that will be applied, in catalogue order.
    #[must_use]
    pub fn active_rules(&self) -> &[&'c FilterRule] {
        &self.rules
    }

    /// Verdict for one candidate: the first matching rule drops it.
    #[must_use]
    pub fn verdict(&self, candidate: &CallCandidate) -> Verdict {
        if self.force_include.contains(&candidate.offset()) {
            return Verdict::Kept;
        }
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(candidate))
            .map_or(Verdict::Kept, |rule| Verdict::Dropped {
                rule: rule.name.clone(),
            })
    }

    /// Annotate every candidate.
    #[must_use]
    pub fn apply(&self, candidates: Vec<CallCandidate>) -> Vec<Filtered> {
        candidates
            .into_iter()
            .map(|candidate| {
                let verdict = self.verdict(&candidate);
                if let Verdict::Dropped { rule } = &verdict {
                    debug!(label = candidate.label(), %rule, "candidate filtered out");
                }
                Filtered { candidate, verdict }
            })
            .collect()
    }
}

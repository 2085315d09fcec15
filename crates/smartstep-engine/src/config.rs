//! Filter configuration loaded from `smartstep.toml`.
//!
//! The file tunes the built-in rules and adds custom ones:
//!
//! ```toml
//! [filters]
//! skip_constructors = false
//! library_prefixes = ["java.", "kotlin."]
//! step_into_classes = ["kotlin.collections.*"]
//!
//! [[filters.custom]]
//! name = "skip-logging"
//! classes = ["org.slf4j.*"]
//! methods = ["debug", "trace"]
//! ```
//!
//! Unknown keys, duplicate rule names and malformed globs are errors.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::debug;

use crate::classify::ConstructKind;
use crate::filter::{
    FilterConfig, FilterRule, RuleCatalog, RulePredicate, DEFAULT_LIBRARY_PREFIXES,
    SKIP_CLASSLOADERS, SKIP_CONSTRUCTORS, SKIP_GETTERS, SKIP_LIBRARY, SKIP_RUNTIME_INTRINSICS,
    SKIP_SYNTHETIC,
};
use crate::pattern::{ClassPattern, MethodPattern, PatternError};

/// File names probed in a root directory, in order.
pub const CONFIG_FILES: &[&str] = &["smartstep.toml", ".smartstep.toml"];

/// Errors raised while loading filter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("filter rule '{0}' is defined more than once")]
    DuplicateRule(SmolStr),

    #[error("custom rule '{0}' needs at least one of classes, methods or kinds")]
    EmptyRule(SmolStr),

    #[error("unknown construct kind '{0}'")]
    UnknownKind(SmolStr),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// A rule declared under `[[filters.custom]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomRule {
    pub name: SmolStr,
    pub classes: Vec<SmolStr>,
    pub methods: Vec<SmolStr>,
    pub kinds: Vec<ConstructKind>,
    pub enabled: bool,
}

/// Parsed filter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSettings {
    /// File the settings came from, if any.
    pub config_path: Option<PathBuf>,
    /// Built-in rule toggles set by the file.
    pub toggles: IndexMap<SmolStr, bool>,
    /// Replacement for the default library prefixes.
    pub library_prefixes: Option<Vec<SmolStr>>,
    /// Class globs exempt from the library rule.
    pub step_into_classes: Vec<SmolStr>,
    pub custom: Vec<CustomRule>,
}

impl FilterSettings {
    /// Load settings from the first config file found in `root`; defaults
    /// when there is none.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let Some(path) = find_config_file(root) else {
            debug!(root = %root.display(), "no filter config found, using defaults");
            return Ok(Self::default());
        };
        Self::load_file(&path)
    }

    /// Load settings from an explicit file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::parse(&contents, &path.display().to_string())?;
        settings.config_path = Some(path.to_path_buf());
        debug!(path = %path.display(), "loaded filter config");
        Ok(settings)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(contents, "filter config")
    }

    fn parse(contents: &str, origin: &str) -> Result<Self, ConfigError> {
        let parsed: ConfigFile = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        let filters = parsed.filters;

        let mut toggles = IndexMap::new();
        for (rule, value) in [
            (SKIP_CONSTRUCTORS, filters.skip_constructors),
            (SKIP_CLASSLOADERS, filters.skip_classloaders),
            (SKIP_SYNTHETIC, filters.skip_synthetic),
            (SKIP_LIBRARY, filters.skip_library),
            (SKIP_RUNTIME_INTRINSICS, filters.skip_runtime_intrinsics),
            (SKIP_GETTERS, filters.skip_getters),
        ] {
            if let Some(enabled) = value {
                toggles.insert(SmolStr::new_static(rule), enabled);
            }
        }

        let builtin = RuleCatalog::builtin();
        let mut custom: Vec<CustomRule> = Vec::with_capacity(filters.custom.len());
        for section in filters.custom {
            let name = SmolStr::new(section.name.trim());
            if builtin.contains(&name) || custom.iter().any(|rule| rule.name == name) {
                return Err(ConfigError::DuplicateRule(name));
            }
            if section.classes.is_empty() && section.methods.is_empty() && section.kinds.is_empty()
            {
                return Err(ConfigError::EmptyRule(name));
            }
            let kinds = section
                .kinds
                .iter()
                .map(|kind| kind.parse::<ConstructKind>().map_err(ConfigError::UnknownKind))
                .collect::<Result<Vec<_>, _>>()?;
            custom.push(CustomRule {
                name,
                classes: section.classes.into_iter().map(SmolStr::from).collect(),
                methods: section.methods.into_iter().map(SmolStr::from).collect(),
                kinds,
                enabled: section.enabled.unwrap_or(true),
            });
        }

        Ok(Self {
            config_path: None,
            toggles,
            library_prefixes: filters
                .library_prefixes
                .map(|prefixes| prefixes.into_iter().map(SmolStr::from).collect()),
            step_into_classes: filters
                .step_into_classes
                .into_iter()
                .map(SmolStr::from)
                .collect(),
            custom,
        })
    }

    /// Build the rule catalogue and the overrides these settings describe.
    pub fn build_rules(&self) -> Result<(RuleCatalog, FilterConfig), ConfigError> {
        let mut catalog = RuleCatalog::builtin();
        if self.library_prefixes.is_some() || !self.step_into_classes.is_empty() {
            let prefixes: Vec<SmolStr> = match &self.library_prefixes {
                Some(prefixes) => prefixes.clone(),
                None => DEFAULT_LIBRARY_PREFIXES
                    .iter()
                    .copied()
                    .map(SmolStr::new_static)
                    .collect(),
            };
            catalog.insert(FilterRule::library(prefixes, &self.step_into_classes)?);
        }
        for rule in &self.custom {
            let classes = rule
                .classes
                .iter()
                .map(|glob| ClassPattern::new(glob))
                .collect::<Result<Vec<_>, _>>()?;
            let methods = rule
                .methods
                .iter()
                .map(|glob| MethodPattern::new(glob))
                .collect::<Result<Vec<_>, _>>()?;
            catalog.insert(FilterRule::new(
                rule.name.clone(),
                "Custom rule",
                rule.enabled,
                RulePredicate::Methods {
                    classes,
                    methods,
                    kinds: rule.kinds.clone(),
                },
            ));
        }

        let mut config = FilterConfig::new();
        for (rule, enabled) in &self.toggles {
            config.set(rule.clone(), *enabled);
        }
        Ok((catalog, config))
    }
}

/// First config file present in `root`.
#[must_use]
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    filters: FiltersSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FiltersSection {
    skip_constructors: Option<bool>,
    skip_classloaders: Option<bool>,
    skip_synthetic: Option<bool>,
    skip_library: Option<bool>,
    skip_runtime_intrinsics: Option<bool>,
    skip_getters: Option<bool>,
    library_prefixes: Option<Vec<String>>,
    #[serde(default)]
    step_into_classes: Vec<String>,
    #[serde(default)]
    custom: Vec<CustomSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CustomSection {
    name: String,
    #[serde(default)]
    classes: Vec<String>,
    #[serde(default)]
    methods: Vec<String>,
    #[serde(default)]
    kinds: Vec<String>,
    enabled: Option<bool>,
}

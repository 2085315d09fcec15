//! `smartstep rules`: the filter catalogue after configuration.

use std::fmt::Write as _;
use std::path::Path;

use serde_json::json;
use smartstep_engine::{FilterConfig, RuleCatalog};

use crate::load_settings;

pub fn run_rules(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let settings = load_settings(config)?;
    let (catalog, filters) = settings.build_rules()?;
    if let Some(path) = &settings.config_path {
        eprintln!("Using {}", path.display());
    }
    print!("{}", render_rules(&catalog, &filters, json)?);
    Ok(())
}

pub fn render_rules(
    catalog: &RuleCatalog,
    filters: &FilterConfig,
    json: bool,
) -> anyhow::Result<String> {
    if json {
        let rules = catalog
            .rules()
            .map(|rule| {
                json!({
                    "name": rule.name.as_str(),
                    "description": rule.description.as_str(),
                    "default": rule.default_enabled,
                    "enabled": filters.is_enabled(rule),
                })
            })
            .collect::<Vec<_>>();
        let mut text = serde_json::to_string_pretty(&json!({ "version": 1, "rules": rules }))?;
        text.push('\n');
        return Ok(text);
    }
    let mut output = String::new();
    for rule in catalog.rules() {
        let state = if filters.is_enabled(rule) { "on" } else { "off" };
        let _ = writeln!(output, "{state:<4}{:<26}{}", rule.name.as_str(), rule.description);
    }
    Ok(output)
}

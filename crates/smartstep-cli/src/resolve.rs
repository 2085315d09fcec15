//! `smartstep resolve`: one stepping request against a class fixture.

use std::fmt::Write as _;

use anyhow::Context;
use serde_json::json;
use smartstep_engine::{
    LineRange, Resolution, ResolveRequest, Resolver, SkipPattern, SmartStepTargets, StepMode,
    StepSpec, SuspendTracker, SuspendedLocation, Verdict,
};

use crate::cli::ResolveArgs;
use crate::fixture::load_fixture;
use crate::load_settings;

pub fn run_resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let pool = load_fixture(&args.fixture)?;
    let settings = load_settings(args.config.as_deref())?;
    let (catalog, mut filters) = settings.build_rules()?;
    for rule in &args.enable {
        filters.set(rule.as_str(), true);
    }
    for rule in &args.disable {
        filters.set(rule.as_str(), false);
    }
    for offset in &args.include_offset {
        filters = filters.include_offset(*offset);
    }

    let mode = if args.smart {
        StepMode::SmartStepInto
    } else {
        StepMode::StepInto
    };
    let location = SuspendedLocation::new(
        1,
        args.class_name.as_str(),
        args.method.as_str(),
        args.descriptor.as_str(),
        0,
        args.line,
    );
    let mut request = ResolveRequest::new(location, mode).with_filters(filters);
    if let Some(end) = args.end_line {
        request = request.with_lines(LineRange::new(args.line, end));
    }

    let tracker = SuspendTracker::new();
    let resolution = Resolver::new(&pool, &catalog)
        .resolve(&request, &tracker.token())
        .with_context(|| {
            format!(
                "cannot resolve step-into at {}.{}{} line {}",
                args.class_name, args.method, args.descriptor, args.line
            )
        })?;
    print!("{}", render_resolution(resolution, args.choose, args.json)?);
    Ok(())
}

pub fn render_resolution(
    resolution: Resolution,
    choose: Option<usize>,
    json: bool,
) -> anyhow::Result<String> {
    match (resolution, choose) {
        (Resolution::Targets(targets), Some(index)) => {
            let spec = targets.choose(index)?;
            render_spec(&spec, json)
        }
        (Resolution::Targets(targets), None) => render_targets(&targets, json),
        (Resolution::Step(spec), _) => render_spec(&spec, json),
        (Resolution::NoCandidate, _) if json => {
            to_json(&json!({ "version": 1, "result": "no-candidate" }))
        }
        (Resolution::NoCandidate, _) => {
            Ok("No step-into target on this line; a line step applies.\n".to_string())
        }
    }
}

fn render_targets(targets: &SmartStepTargets, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(&json!({
            "version": 1,
            "result": "targets",
            "candidates": targets.candidates(),
            "filtered": targets.filtered(),
        }));
    }
    let mut output = String::new();
    let _ = writeln!(output, "{} candidate(s):", targets.len());
    for (index, candidate) in targets.candidates().iter().enumerate() {
        let _ = write!(
            output,
            "  [{index}] {:<28} {:<16} line {} @{}",
            candidate.label(),
            candidate.kind().to_string(),
            candidate.line(),
            candidate.offset()
        );
        match candidate.source_file() {
            Some(file) => {
                let _ = writeln!(output, " in {file}");
            }
            None => output.push('\n'),
        }
    }
    let dropped: Vec<_> = targets
        .filtered()
        .iter()
        .filter_map(|filtered| match &filtered.verdict {
            Verdict::Dropped { rule } => Some((filtered.candidate.label(), rule)),
            Verdict::Kept => None,
        })
        .collect();
    if !dropped.is_empty() {
        let _ = writeln!(output, "filtered:");
        for (label, rule) in dropped {
            let _ = writeln!(output, "  {label:<32} {rule}");
        }
    }
    Ok(output)
}

fn render_spec(spec: &StepSpec, json: bool) -> anyhow::Result<String> {
    if json {
        return to_json(&json!({ "version": 1, "result": "step", "step": spec }));
    }
    let target = spec.target();
    let mut output = String::new();
    let _ = writeln!(output, "step into {} (line {})", target.label, target.line);
    let _ = writeln!(
        output,
        "  target {}.{}{}{}{}",
        target.class,
        target.method,
        target.descriptor,
        if target.match_subtypes {
            " (or override)"
        } else {
            ""
        },
        if target.ordinal > 0 {
            format!(", occurrence {}", target.ordinal + 1)
        } else {
            String::new()
        }
    );
    for pattern in spec.skip_patterns() {
        let _ = writeln!(output, "  skip   {}", describe_skip(pattern));
    }
    Ok(output)
}

fn describe_skip(pattern: &SkipPattern) -> String {
    let mut text = pattern.class.to_string();
    if let Some(method) = &pattern.method {
        let _ = write!(text, ".{method}");
    }
    if !pattern.except.is_empty() {
        let except: Vec<_> = pattern.except.iter().map(ToString::to_string).collect();
        let _ = write!(text, " except {}", except.join(", "));
    }
    text
}

fn to_json(payload: &serde_json::Value) -> anyhow::Result<String> {
    let mut text = serde_json::to_string_pretty(payload)?;
    text.push('\n');
    Ok(text)
}

mod common;

use expect_test::expect;
use smartstep_bytecode::{
    parse_listing, AccessFlags, ClassInfo, ClassKind, ClassPool, MetadataProvider, MethodInfo,
};
use smartstep_engine::filter::{SKIP_CLASSLOADERS, SKIP_CONSTRUCTORS, SKIP_LIBRARY};
use smartstep_engine::{
    scan, Classifier, ConstructKind, FilterConfig, FilterEngine, FilterSettings, LineRange,
    Resolution, ResolveError, ResolveRequest, Resolver, RuleCatalog, StepMode, SuspendTracker,
    SuspendedLocation, Verdict,
};

use common::{demo_pool, location_at, render, request, smart_targets, MAIN_CLASS};

fn kinds(pool: &ClassPool, line: u32, filters: FilterConfig) -> Vec<ConstructKind> {
    smart_targets(pool, line, filters)
        .map(|targets| targets.candidates().iter().map(|c| c.kind()).collect())
        .unwrap_or_default()
}

#[test]
fn argument_call_precedes_enclosing_member_call() {
    let pool = demo_pool();
    let targets = smart_targets(&pool, 11, FilterConfig::new()).expect("targets");
    let labels: Vec<_> = targets.candidates().iter().map(|c| c.label()).collect();
    assert_eq!(labels, ["topLevelFun()", "A.member(int)"]);
    assert_eq!(
        kinds(&pool, 11, FilterConfig::new()),
        [ConstructKind::TopLevel, ConstructKind::Member]
    );
}

#[test]
fn candidates_across_a_block_render_in_evaluation_order() {
    let pool = demo_pool();
    let catalog = RuleCatalog::builtin();
    let tracker = SuspendTracker::new();
    let request = request(11, StepMode::SmartStepInto, FilterConfig::new())
        .with_lines(LineRange::new(11, 18));
    let Resolution::Targets(targets) = Resolver::new(&pool, &catalog)
        .resolve(&request, &tracker.token())
        .unwrap()
    else {
        panic!("expected targets");
    };
    expect![[r#"
        11 @9 topLevelFun() [TopLevel]
        11 @12 A.member(int) [Member]
        12 @16 A.x [PropertyGetter]
        13 @24 A.x = [PropertySetter]
        14 @30 A.foo() [CompanionMember]
        15 @36 Obj.foo() [ObjectMember]
        16 @40 String.extFun() [Extension]
        17 @43 JavaHelper.javaFun() [Member]
        18 @46 counter [PropertyGetter]
    "#]]
    .assert_eq(&render(&targets));
}

#[test]
fn property_read_reports_declaring_type() {
    let pool = demo_pool();
    let targets = smart_targets(&pool, 12, FilterConfig::new()).expect("targets");
    let [getter] = targets.candidates() else {
        panic!("expected one candidate, got {}", targets.len());
    };
    assert_eq!(getter.kind(), ConstructKind::PropertyGetter);
    assert_eq!(getter.logical_owner(), "demo.A");
    assert_eq!(getter.member(), "x");
    let dropped: Vec<_> = targets
        .filtered()
        .iter()
        .filter_map(|f| match &f.verdict {
            Verdict::Dropped { rule } => Some((f.candidate.label(), rule.as_str())),
            Verdict::Kept => None,
        })
        .collect();
    assert_eq!(dropped, [("println(int)", SKIP_LIBRARY)]);
}

#[test]
fn top_level_property_belongs_to_the_package() {
    let pool = demo_pool();
    let targets = smart_targets(&pool, 18, FilterConfig::new()).expect("targets");
    assert_eq!(targets.candidates()[0].logical_owner(), "demo");
    assert_eq!(targets.candidates()[0].label(), "counter");
}

#[test]
fn companion_and_object_members_resolve_to_their_declarations() {
    let pool = demo_pool();
    let companion = smart_targets(&pool, 14, FilterConfig::new()).expect("companion");
    assert_eq!(companion.candidates()[0].kind(), ConstructKind::CompanionMember);
    assert_eq!(companion.candidates()[0].logical_owner(), "demo.A");

    let object = smart_targets(&pool, 15, FilterConfig::new()).expect("object");
    assert_eq!(object.candidates()[0].kind(), ConstructKind::ObjectMember);
    assert_eq!(object.candidates()[0].logical_owner(), "demo.Obj");
}

#[test]
fn extension_on_library_type_is_not_library_code() {
    let pool = demo_pool();
    let targets = smart_targets(&pool, 16, FilterConfig::new()).expect("targets");
    let ext = &targets.candidates()[0];
    assert_eq!(ext.kind(), ConstructKind::Extension);
    assert_eq!(ext.receiver(), Some("String"));
    assert_eq!(ext.logical_owner(), "demo");
}

#[test]
fn skip_constructors_keeps_only_the_member() {
    let pool = demo_pool();
    // Line 20 constructs a loader and calls into it.
    let filters = FilterConfig::new().disable(SKIP_CLASSLOADERS);
    assert_eq!(kinds(&pool, 20, filters), [ConstructKind::Member]);
}

#[test]
fn do_not_skip_constructors() {
    let pool = demo_pool();
    assert!(smart_targets(&pool, 10, FilterConfig::new()).is_none());
    let targets = smart_targets(&pool, 10, FilterConfig::new().disable(SKIP_CONSTRUCTORS))
        .expect("targets");
    assert_eq!(targets.candidates()[0].label(), "A()");
    let spec = targets.choose(0).unwrap();
    assert_eq!(spec.target().method, "<init>");
    assert!(!spec.target().match_subtypes);
}

#[test]
fn skip_classloader_by_default() {
    let pool = demo_pool();
    assert!(smart_targets(&pool, 20, FilterConfig::new()).is_none());
    // The loader's own constructor is classloading machinery as well.
    assert!(smart_targets(&pool, 20, FilterConfig::new().disable(SKIP_CONSTRUCTORS)).is_none());

    let (class, method) = pool.method(MAIN_CLASS, "main", "()V").expect("main");
    let calls = scan(class, method, LineRange::single(20)).unwrap();
    let catalog = RuleCatalog::builtin();
    let engine = FilterEngine::new(&catalog, &FilterConfig::new()).unwrap();
    let verdicts: Vec<_> = engine
        .apply(Classifier::new(&pool).classify_all(&calls))
        .into_iter()
        .map(|f| (f.candidate.label().to_string(), f.verdict))
        .collect();
    assert_eq!(
        verdicts,
        [
            (
                "PluginClassLoader()".to_string(),
                Verdict::Dropped {
                    rule: SKIP_CONSTRUCTORS.into()
                }
            ),
            (
                "PluginClassLoader.loadPlugin()".to_string(),
                Verdict::Dropped {
                    rule: SKIP_CLASSLOADERS.into()
                }
            ),
        ]
    );
}

#[test]
fn do_not_skip_classloader() {
    let pool = demo_pool();
    let targets = smart_targets(&pool, 20, FilterConfig::new().disable(SKIP_CLASSLOADERS))
        .expect("targets");
    let labels: Vec<_> = targets.candidates().iter().map(|c| c.label()).collect();
    assert_eq!(labels, ["PluginClassLoader.loadPlugin()"]);
}

#[test]
fn loader_subclass_is_skipped_whatever_its_name() {
    let mut pool = demo_pool();
    let mut host = ClassInfo::new("demo/PluginHost", ClassKind::Class);
    host.super_name = Some("demo/PluginClassLoader".into());
    let body = parse_listing(
        "line 3\naload 0\ninvokevirtual demo/PluginHost.reload ()V\n\
         aload 0\ninvokevirtual demo/PluginHost.describe ()V\nline 4\nreturn\n",
        &mut host.constant_pool,
    )
    .unwrap();
    host.methods.extend([
        MethodInfo::new("run", "()V", AccessFlags::PUBLIC).with_body(body),
        MethodInfo::new("reload", "()V", AccessFlags::PUBLIC),
        MethodInfo::new("describe", "()V", AccessFlags::PUBLIC),
    ]);
    pool.insert(host);

    let catalog = RuleCatalog::builtin();
    let tracker = SuspendTracker::new();
    let location = SuspendedLocation::new(1, "demo/PluginHost", "run", "()V", 0, 3);
    let resolution = Resolver::new(&pool, &catalog)
        .resolve(
            &ResolveRequest::new(location.clone(), StepMode::SmartStepInto),
            &tracker.token(),
        )
        .unwrap();
    assert!(matches!(resolution, Resolution::NoCandidate));

    let request = ResolveRequest::new(location, StepMode::SmartStepInto)
        .with_filters(FilterConfig::new().disable(SKIP_CLASSLOADERS));
    let Resolution::Targets(targets) = Resolver::new(&pool, &catalog)
        .resolve(&request, &tracker.token())
        .unwrap()
    else {
        panic!("expected targets");
    };
    let labels: Vec<_> = targets.candidates().iter().map(|c| c.label()).collect();
    assert_eq!(labels, ["PluginHost.reload()", "PluginHost.describe()"]);
    assert!(targets.candidates().iter().all(|c| c.is_class_loader()));
}

#[test]
fn top_level_and_extension_calls_carry_their_file() {
    let pool = demo_pool();
    let targets = smart_targets(&pool, 11, FilterConfig::new()).expect("targets");
    let files: Vec<_> = targets.candidates().iter().map(|c| c.source_file()).collect();
    assert_eq!(files, [Some("Main.kt"), None]);

    // No source attribute on the extension's facade: derived from its name.
    let targets = smart_targets(&pool, 16, FilterConfig::new()).expect("targets");
    assert_eq!(targets.candidates()[0].source_file(), Some("Ext.kt"));
}

#[test]
fn runtime_null_checks_are_skipped() {
    let pool = demo_pool();
    assert!(smart_targets(&pool, 19, FilterConfig::new()).is_none());
    // Still skipped when library code is allowed.
    assert!(smart_targets(&pool, 19, FilterConfig::new().disable(SKIP_LIBRARY)).is_none());
}

#[test]
fn step_into_stdlib() {
    let pool = demo_pool();
    assert!(smart_targets(&pool, 21, FilterConfig::new()).is_none());
    let targets =
        smart_targets(&pool, 21, FilterConfig::new().disable(SKIP_LIBRARY)).expect("targets");
    let labels: Vec<_> = targets.candidates().iter().map(|c| c.label()).collect();
    assert_eq!(labels, ["listOf(Object)", "List.size()"]);
    assert_eq!(targets.candidates()[1].kind(), ConstructKind::Unknown);
}

#[test]
fn step_into_specific_kotlin_classes() {
    let pool = demo_pool();
    let settings =
        FilterSettings::from_toml("[filters]\nstep_into_classes = [\"kotlin.collections.*\"]\n")
            .unwrap();
    let (catalog, filters) = settings.build_rules().unwrap();
    let tracker = SuspendTracker::new();
    let resolution = Resolver::new(&pool, &catalog)
        .resolve(&request(21, StepMode::SmartStepInto, filters), &tracker.token())
        .unwrap();
    let Resolution::Targets(targets) = resolution else {
        panic!("expected targets");
    };
    let labels: Vec<_> = targets.candidates().iter().map(|c| c.label()).collect();
    assert_eq!(labels, ["listOf(Object)"]);
    let spec = targets.choose(0).unwrap();
    assert!(spec.should_skip("java.util.ArrayList", "size"));
    assert!(!spec.should_skip("kotlin.collections.CollectionsKt", "listOf"));
    assert!(!spec.should_skip("kotlin.collections.ArraysKt", "asList"));
}

#[test]
fn synthetic_dispatchers_and_lambdas_are_not_offered() {
    let pool = demo_pool();
    assert!(smart_targets(&pool, 23, FilterConfig::new()).is_none());
    let targets = smart_targets(&pool, 24, FilterConfig::new()).expect("targets");
    let labels: Vec<_> = targets.candidates().iter().map(|c| c.label()).collect();
    assert_eq!(labels, ["runBlock(Function0)"]);
}

#[test]
fn repeated_calls_stay_distinct_and_count_ordinals() {
    let pool = demo_pool();
    let targets = smart_targets(&pool, 22, FilterConfig::new()).expect("targets");
    assert_eq!(targets.len(), 2);
    assert_eq!(targets.choose(0).unwrap().target().ordinal, 0);
    assert_eq!(targets.choose(1).unwrap().target().ordinal, 1);
}

#[test]
fn step_into_picks_the_innermost_call() {
    let pool = demo_pool();
    let catalog = RuleCatalog::builtin();
    let tracker = SuspendTracker::new();
    let resolution = Resolver::new(&pool, &catalog)
        .resolve(
            &request(11, StepMode::StepInto, FilterConfig::new()),
            &tracker.token(),
        )
        .unwrap();
    let Resolution::Step(spec) = resolution else {
        panic!("expected a step");
    };
    assert_eq!(spec.target().class, "demo.MainKt");
    assert_eq!(spec.target().method, "topLevelFun");
    assert_eq!(spec.target().label, "topLevelFun()");
    assert!(spec.should_skip("demo.A", "member"));
    assert!(spec.should_stop(&pool, "demo.MainKt", "topLevelFun", "()I"));
}

#[test]
fn step_into_without_candidates_falls_back() {
    let pool = demo_pool();
    let catalog = RuleCatalog::builtin();
    let tracker = SuspendTracker::new();
    let resolution = Resolver::new(&pool, &catalog)
        .resolve(
            &request(25, StepMode::StepInto, FilterConfig::new()),
            &tracker.token(),
        )
        .unwrap();
    assert!(matches!(resolution, Resolution::NoCandidate));
}

#[test]
fn line_outside_the_method_is_rejected() {
    let pool = demo_pool();
    let catalog = RuleCatalog::builtin();
    let tracker = SuspendTracker::new();
    let err = Resolver::new(&pool, &catalog)
        .resolve(
            &request(40, StepMode::StepInto, FilterConfig::new()),
            &tracker.token(),
        )
        .unwrap_err();
    assert_eq!(
        err,
        ResolveError::InvalidLineRange {
            start: 40,
            end: 40,
            method: "demo/MainKt.main()V".into(),
            covered: "10..=25".into(),
        }
    );
    assert_eq!(
        err.to_string(),
        "line range 40..=40 is outside demo/MainKt.main()V (lines 10..=25)"
    );
}

#[test]
fn unknown_rule_fails_before_scanning() {
    let pool = demo_pool();
    let catalog = RuleCatalog::builtin();
    let tracker = SuspendTracker::new();
    let err = Resolver::new(&pool, &catalog)
        .resolve(
            &request(40, StepMode::StepInto, FilterConfig::new().enable("skip-everything")),
            &tracker.token(),
        )
        .unwrap_err();
    assert_eq!(err, ResolveError::UnknownFilterRule("skip-everything".into()));
}

#[test]
fn missing_method_is_unresolved_metadata() {
    let pool = demo_pool();
    let catalog = RuleCatalog::builtin();
    let tracker = SuspendTracker::new();
    let mut location = location_at(11);
    location.method_name = "gone".into();
    let request = ResolveRequest::new(location, StepMode::StepInto);
    let err = Resolver::new(&pool, &catalog)
        .resolve(&request, &tracker.token())
        .unwrap_err();
    assert!(matches!(err, ResolveError::UnresolvedMetadata(_)));
}

#[test]
fn choose_out_of_range() {
    let pool = demo_pool();
    let targets = smart_targets(&pool, 11, FilterConfig::new()).expect("targets");
    assert_eq!(
        targets.choose(2).unwrap_err(),
        ResolveError::CandidateOutOfRange { index: 2, len: 2 }
    );
}

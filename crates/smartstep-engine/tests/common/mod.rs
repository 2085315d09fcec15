#![allow(dead_code)]

use smartstep_bytecode::{
    parse_listing, AccessFlags, ClassInfo, ClassKind, ClassPool, FieldInfo, MethodInfo,
};
use smartstep_engine::{
    FilterConfig, Resolution, ResolveRequest, Resolver, RuleCatalog, SmartStepTargets, StepMode,
    SuspendTracker, SuspendedLocation,
};

pub const MAIN_CLASS: &str = "demo/MainKt";

/// `main` of a small Kotlin file, one statement per line:
///
/// ```text
/// 10  val a = A()
/// 11  a.member(topLevelFun())
/// 12  println(a.x)
/// 13  a.x = 5
/// 14  A.foo()
/// 15  Obj.foo()
/// 16  "text".extFun()
/// 17  JavaHelper.javaFun()
/// 18  val size = counter
/// 19  checkNotNull parameter
/// 20  PluginClassLoader().loadPlugin()
/// 21  listOf(null).size
/// 22  twice(twice(1))
/// 23  greet(null)
/// 24  runBlock { }
/// ```
pub const MAIN_LISTING: &str = r"
line 10
new demo/A
dup
invokespecial demo/A.<init> ()V
astore 1
line 11
aload 1
invokestatic demo/MainKt.topLevelFun ()I
invokevirtual demo/A.member (I)V
line 12
aload 1
invokevirtual demo/A.getX ()I
invokestatic kotlin/io/ConsoleKt.println (I)V
line 13
aload 1
iconst 5
invokevirtual demo/A.setX (I)V
line 14
getstatic demo/A.Companion Ldemo/A$Companion;
invokevirtual demo/A$Companion.foo ()V
line 15
getstatic demo/Obj.INSTANCE Ldemo/Obj;
invokevirtual demo/Obj.foo ()V
line 16
aconst_null
invokestatic demo/ExtKt.extFun (Ljava/lang/String;)V
line 17
invokestatic demo/JavaHelper.javaFun ()V
line 18
invokestatic demo/MainKt.getCounter ()I
istore 2
line 19
aconst_null
aconst_null
invokestatic kotlin/jvm/internal/Intrinsics.checkNotNullParameter (Ljava/lang/Object;Ljava/lang/String;)V
line 20
new demo/PluginClassLoader
dup
invokespecial demo/PluginClassLoader.<init> ()V
invokevirtual demo/PluginClassLoader.loadPlugin ()V
line 21
aconst_null
invokestatic kotlin/collections/CollectionsKt.listOf (Ljava/lang/Object;)Ljava/util/List;
invokeinterface java/util/List.size ()I
pop
line 22
iconst 1
invokestatic demo/MainKt.twice (I)I
invokestatic demo/MainKt.twice (I)I
pop
line 23
aconst_null
iconst 1
aconst_null
invokestatic demo/MainKt.greet$default (Ljava/lang/String;ILjava/lang/Object;)V
line 24
invokedynamic invoke ()Lkotlin/jvm/functions/Function0;
invokestatic demo/MainKt.runBlock (Lkotlin/jvm/functions/Function0;)V
line 25
return
";

fn method(name: &str, descriptor: &str, access: AccessFlags) -> MethodInfo {
    MethodInfo::new(name, descriptor, access)
}

fn public_static() -> AccessFlags {
    AccessFlags::PUBLIC | AccessFlags::STATIC
}

/// Classes of the demo program plus the library classes it was compiled
/// against. `kotlin/io/ConsoleKt`, `kotlin/jvm/internal/Intrinsics` and
/// `java/util/List` are deliberately absent.
pub fn demo_pool() -> ClassPool {
    let mut pool = ClassPool::new();

    let mut main = ClassInfo::new(MAIN_CLASS, ClassKind::FileFacade);
    main.source_file = Some("Main.kt".into());
    let body = parse_listing(MAIN_LISTING, &mut main.constant_pool).expect("main listing");
    main.fields.push(FieldInfo::new(
        "counter",
        "I",
        AccessFlags::PRIVATE | AccessFlags::STATIC,
    ));
    main.methods.extend([
        method("main", "()V", public_static()).with_body(body),
        method("topLevelFun", "()I", public_static()),
        method("getCounter", "()I", public_static()),
        method("twice", "(I)I", public_static()),
        method("greet", "(Ljava/lang/String;I)V", public_static()),
        method(
            "greet$default",
            "(Ljava/lang/String;ILjava/lang/Object;)V",
            public_static() | AccessFlags::SYNTHETIC,
        ),
        method("runBlock", "(Lkotlin/jvm/functions/Function0;)V", public_static()),
    ]);
    pool.insert(main);

    let mut a = ClassInfo::new("demo/A", ClassKind::Class);
    a.fields.extend([
        FieldInfo::new("x", "I", AccessFlags::PRIVATE),
        FieldInfo::new(
            "Companion",
            "Ldemo/A$Companion;",
            AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
        ),
    ]);
    a.methods.extend([
        method("<init>", "()V", AccessFlags::PUBLIC),
        method("member", "(I)V", AccessFlags::PUBLIC),
        method("getX", "()I", AccessFlags::PUBLIC),
        method("setX", "(I)V", AccessFlags::PUBLIC),
    ]);
    pool.insert(a);

    let mut companion = ClassInfo::new("demo/A$Companion", ClassKind::Class);
    companion
        .methods
        .push(method("foo", "()V", AccessFlags::PUBLIC));
    pool.insert(companion);

    let mut object = ClassInfo::new("demo/Obj", ClassKind::Class);
    object.fields.push(FieldInfo::new(
        "INSTANCE",
        "Ldemo/Obj;",
        AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
    ));
    object.methods.push(method("foo", "()V", AccessFlags::PUBLIC));
    pool.insert(object);

    let mut ext = ClassInfo::new("demo/ExtKt", ClassKind::FileFacade);
    ext.methods.push(
        method("extFun", "(Ljava/lang/String;)V", public_static())
            .with_receiver("java/lang/String"),
    );
    pool.insert(ext);

    let mut java = ClassInfo::new("demo/JavaHelper", ClassKind::Class);
    java.methods.push(method("javaFun", "()V", public_static()));
    pool.insert(java);

    let mut loader = ClassInfo::new("demo/PluginClassLoader", ClassKind::Class);
    loader.super_name = Some("java/lang/ClassLoader".into());
    loader.methods.extend([
        method("<init>", "()V", AccessFlags::PUBLIC),
        method("loadPlugin", "()V", AccessFlags::PUBLIC),
    ]);
    pool.insert(loader);

    let mut collections =
        ClassInfo::new("kotlin/collections/CollectionsKt", ClassKind::MultifileFacade);
    collections.methods.push(method(
        "listOf",
        "(Ljava/lang/Object;)Ljava/util/List;",
        public_static(),
    ));
    pool.insert(collections);

    pool
}

/// Suspended at the start of `line` in `MainKt.main`.
pub fn location_at(line: u32) -> SuspendedLocation {
    SuspendedLocation::new(1, MAIN_CLASS, "main", "()V", 0, line)
}

pub fn request(line: u32, mode: StepMode, filters: FilterConfig) -> ResolveRequest {
    ResolveRequest::new(location_at(line), mode).with_filters(filters)
}

/// Smart step-into on one line with builtin rules.
pub fn smart_targets(
    pool: &ClassPool,
    line: u32,
    filters: FilterConfig,
) -> Option<SmartStepTargets> {
    let catalog = RuleCatalog::builtin();
    let tracker = SuspendTracker::new();
    let resolver = Resolver::new(pool, &catalog);
    match resolver
        .resolve(&request(line, StepMode::SmartStepInto, filters), &tracker.token())
        .expect("resolution")
    {
        Resolution::Targets(targets) => Some(targets),
        Resolution::NoCandidate => None,
        Resolution::Step(_) => panic!("smart step-into produced a step"),
    }
}

/// `label [Kind]` per candidate, one per line.
pub fn render(targets: &SmartStepTargets) -> String {
    targets
        .candidates()
        .iter()
        .map(|candidate| {
            format!(
                "{} @{} {} [{}]\n",
                candidate.line(),
                candidate.offset(),
                candidate.label(),
                candidate.kind()
            )
        })
        .collect()
}

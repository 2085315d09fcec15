#![no_main]

use libfuzzer_sys::fuzz_target;
use smartstep_bytecode::{
    parse_listing, AccessFlags, ClassInfo, ClassKind, ClassPool, LineEntry, LineNumberTable,
    MethodBody, MethodInfo,
};
use smartstep_engine::{
    FilterConfig, LineRange, Resolution, ResolveRequest, Resolver, RuleCatalog, StepMode,
    SuspendTracker, SuspendedLocation,
};

const MAX_CODE_BYTES: usize = 1024;

// Interns a handful of method refs so random pool indices sometimes resolve.
const SEED_LISTING: &str = "
line 1
invokestatic fuzz/MainKt.top ()V
invokevirtual fuzz/A.getX ()I
invokespecial fuzz/A.<init> ()V
invokeinterface java/util/List.size ()I
invokestatic fuzz/MainKt.f$default (ILjava/lang/Object;)V
return
";

fn line_table(seed: &[u8], code_len: usize) -> LineNumberTable {
    let entries = seed
        .chunks(2)
        .map(|pair| LineEntry {
            start_pc: u32::from(pair[0]) % code_len.max(1) as u32,
            line: 1 + u32::from(*pair.get(1).unwrap_or(&0) % 8),
        })
        .collect();
    LineNumberTable::new(entries)
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let table_len = usize::from(data[0] % 16) * 2;
    let (seed, code) = data[2..].split_at(table_len.min(data.len() - 2));
    let code = &code[..code.len().min(MAX_CODE_BYTES)];

    let mut main = ClassInfo::new("fuzz/MainKt", ClassKind::FileFacade);
    if parse_listing(SEED_LISTING, &mut main.constant_pool).is_err() {
        return;
    }
    let body = MethodBody::new(code.to_vec(), line_table(seed, code.len()));
    let access = AccessFlags::PUBLIC | AccessFlags::STATIC;
    main.methods
        .push(MethodInfo::new("main", "()V", access).with_body(body));
    let mut pool = ClassPool::new();
    pool.insert(main);

    let catalog = RuleCatalog::builtin();
    let tracker = SuspendTracker::new();
    let start = 1 + u32::from(data[1] % 8);
    let location = SuspendedLocation::new(1, "fuzz/MainKt", "main", "()V", 0, start);
    let request = ResolveRequest::new(location, StepMode::SmartStepInto)
        .with_lines(LineRange::new(start, start + u32::from(data[1] >> 5)))
        .with_filters(FilterConfig::new());
    let Ok(Resolution::Targets(targets)) =
        Resolver::new(&pool, &catalog).resolve(&request, &tracker.token())
    else {
        return;
    };
    for index in 0..targets.len() {
        let _ = targets.choose(index);
    }
});

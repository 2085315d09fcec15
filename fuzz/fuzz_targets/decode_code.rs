#![no_main]

use libfuzzer_sys::fuzz_target;
use smartstep_bytecode::decode_code;

fuzz_target!(|data: &[u8]| {
    let Ok(insns) = decode_code(data) else {
        return;
    };
    let mut previous = None;
    for insn in &insns {
        assert!((insn.offset as usize) < data.len());
        if let Some(previous) = previous {
            assert!(insn.offset > previous);
        }
        previous = Some(insn.offset);
    }
});

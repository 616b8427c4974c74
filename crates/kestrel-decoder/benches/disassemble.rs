//! Disassembly Benchmarks
//!
//! Measures single-line rendering and full-buffer listing throughput.

use criterion::{Criterion, criterion_group, criterion_main};
use kestrel_decoder::{BytecodeIterator, decode};
use std::fmt::Write;
use std::hint::black_box;

/// A short function body mixing plain, Wide and ExtraWide instructions
fn sample_program() -> Vec<u8> {
    let body: &[u8] = &[
        0x1E, // StackCheck
        0x0A, 0x00, // LoadConstant [0]
        0x0D, 0x00, // StoreRegister r0
        0x00, 0x09, 0xE8, 0x03, // LoadSmi.Wide [1000]
        0x05, 0x00, 0x01, // Add r0, r1
        0x13, 0x01, 0x02, 0x02, 0x00, // CallProperty r1, r2, #2, [0]
        0x16, 0x02, 0x00, 0x00, 0x00, 0x05, // CallRuntimeForPair [2], r0, #0, r5-r6
        0x01, 0x0A, 0x01, 0x00, 0x01, 0x00, // LoadConstant.ExtraWide [65537]
        0x18, 0x01, 0x04, // ForInPrepare r1-r3, [4]
        0x20, // Return
    ];
    body.repeat(64)
}

fn bench_single_instruction(c: &mut Criterion) {
    let bytes = [0x13, 0x01, 0x02, 0x02, 0x00];
    let mut out = String::with_capacity(64);

    c.bench_function("decode_call_property", |b| {
        b.iter(|| {
            out.clear();
            decode(&mut out, black_box(&bytes), 3).unwrap();
            black_box(out.len())
        })
    });
}

fn bench_listing(c: &mut Criterion) {
    let program = sample_program();
    let mut out = String::with_capacity(program.len() * 40);

    c.bench_function("list_mixed_program", |b| {
        b.iter(|| {
            out.clear();
            for insn in BytecodeIterator::new(black_box(&program)) {
                let insn = insn.unwrap();
                writeln!(out, "@ {:>4} : {}", insn.offset(), insn.display(3)).unwrap();
            }
            black_box(out.len())
        })
    });
}

criterion_group!(benches, bench_single_instruction, bench_listing);
criterion_main!(benches);

// Benchmark for line cleaning and tracking throughput
// Run with: cargo bench

use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use gcode_forge::{Config, Dialect};

fn bench_clean_pass(c: &mut Criterion) {
    let mut program = String::new();
    for i in 0..10_000 {
        program.push_str(&format!("G1 X{} Y{} F1500\n", i, i));
    }
    let config = Config {
        dialect: Dialect::Printer3d,
        ..Config::default()
    };
    c.bench_function("clean 10k G1 lines", |b| {
        b.iter(|| {
            let mut processor = config.processor(Cursor::new(program.as_bytes())).unwrap();
            let cleaned = processor.process().unwrap();
            assert_eq!(cleaned.len(), 10_000);
        });
    });
}

fn bench_grammar_extraction(c: &mut Criterion) {
    let set = Dialect::Marlin.instruction_set(false).unwrap();
    let command = set.line(false).unwrap();
    c.bench_function("extract one G1 line", |b| {
        b.iter(|| {
            let params = command.parse("G1 X12.5 Y-3.75 E0.42 F1500");
            assert_eq!(params.len(), 4);
        });
    });
}

criterion_group!(benches, bench_clean_pass, bench_grammar_extraction);
criterion_main!(benches);

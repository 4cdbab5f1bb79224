//! Benchmarks for kernel construction and ordering
//!
//! Run with: cargo bench -p qroute-ir

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qroute_ir::{BlockId, OpKind, Program};

/// A ladder of H and CX gates over `n` qubits.
fn ladder(n: u32, layers: u32) -> Program {
    let mut program = Program::new("ladder", n);
    for _ in 0..layers {
        for q in 0..n {
            program.push(OpKind::gate("h"), [q]);
        }
        for q in 0..n.saturating_sub(1) {
            program.push(OpKind::gate("cx"), [q, q + 1]);
        }
    }
    program
}

/// Benchmark lowering programs into wire form
fn bench_into_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("into_kernel");

    for num_qubits in &[5u32, 20, 50] {
        let program = ladder(*num_qubits, 10);
        group.bench_with_input(
            BenchmarkId::new("ladder", num_qubits),
            &program,
            |b, p| {
                b.iter(|| black_box(p.clone()).into_kernel().unwrap());
            },
        );
    }

    group.finish();
}

/// Benchmark verification and topological ordering
fn bench_kernel_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_checks");
    let kernel = ladder(20, 20).into_kernel().unwrap();

    group.bench_function("verify", |b| {
        b.iter(|| black_box(&kernel).verify().unwrap());
    });

    group.bench_function("sort_topologically", |b| {
        b.iter(|| {
            let mut k = kernel.clone();
            k.sort_topologically(BlockId::ENTRY).unwrap();
            black_box(k);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_into_kernel, bench_kernel_checks);
criterion_main!(benches);

//! Benchmarks for linear solvers and small-signal sweeps.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use smallsig_core::NodeId;
use smallsig_devices::Circuit;
use smallsig_devices::passive::{Capacitor, Resistor};
use smallsig_devices::sources::{CurrentSource, VoltageSource};
use smallsig_solver::linear::{solve_dense, solve_sparse_complex};
use smallsig_solver::{
    FixedOperatingPoint, FrequencySweep, NoiseSpec, SimOptions, SparseLu, SweepJob,
    TransferFunctionSpec, TransferOutput,
};

fn bench_solve_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve_dense");

    for size in [10, 50, 100] {
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &size,
            |bencher, &size| {
                // Diagonally dominant, so never singular
                let a = DMatrix::from_fn(size, size, |i, j| {
                    if i == j {
                        (size as f64) + 1.0
                    } else {
                        1.0 / ((i as f64 - j as f64).abs() + 1.0)
                    }
                });
                let rhs = DVector::from_fn(size, |i, _| (i + 1) as f64);

                bencher.iter(|| solve_dense(black_box(&a), black_box(&rhs)).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_solve_sparse_complex(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve_sparse_complex");

    for size in [50, 200, 1000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &size,
            |bencher, &size| {
                // Band structure like an RC ladder at one frequency
                let mut triplets = Vec::new();
                for i in 0..size {
                    triplets.push((i, i, Complex::new(size as f64 + 1.0, 0.1)));
                    if i + 1 < size {
                        let y = Complex::new(-1.0, -0.05);
                        triplets.push((i, i + 1, y));
                        triplets.push((i + 1, i, y));
                    }
                }
                let rhs = DVector::from_fn(size, |i, _| Complex::new((i + 1) as f64, 0.0));

                bencher.iter(|| {
                    solve_sparse_complex(black_box(size), black_box(&triplets), black_box(&rhs))
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

/// RC ladder of `sections` stages driven at node `n0`.
fn ladder(sections: usize, voltage_input: bool) -> Circuit {
    let mut ckt = Circuit::new();
    let mut prev = ckt.node("n0");
    if voltage_input {
        let inp = ckt.node("in");
        ckt.add(VoltageSource::new("VIN", inp, NodeId::GROUND, 0.0).with_ac(1.0, 0.0));
        ckt.add(Resistor::new("RS", inp, prev, 50.0));
    } else {
        ckt.add(CurrentSource::new("IIN", prev, NodeId::GROUND, 0.0).with_ac(1.0, 0.0));
        ckt.add(Resistor::new("RS", prev, NodeId::GROUND, 50.0));
    }
    for i in 1..=sections {
        let next = ckt.node(&format!("n{i}"));
        ckt.add(Resistor::new(format!("R{i}"), prev, next, 100.0));
        ckt.add(Capacitor::new(format!("C{i}"), next, NodeId::GROUND, 1e-12));
        prev = next;
    }
    ckt.add(Resistor::new("RL", prev, NodeId::GROUND, 1e3));
    ckt
}

fn bench_noise_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise_sweep");
    group.sample_size(20);
    let solver = SparseLu::default();
    let opts = SimOptions::default();

    for sections in [10, 100] {
        group.bench_with_input(
            BenchmarkId::from_parameter(sections),
            &sections,
            |bencher, &sections| {
                let mut ckt = ladder(sections, false);
                let output = format!("n{sections}");
                bencher.iter(|| {
                    let spec =
                        NoiseSpec::new(&output, "IIN", FrequencySweep::decade(1e3, 1e9, 10));
                    let mut job =
                        SweepJob::begin(&mut ckt, &solver, spec, FixedOperatingPoint, &opts)
                            .unwrap();
                    job.run().unwrap();
                    black_box(job.finish())
                });
            },
        );
    }

    group.finish();
}

fn bench_transfer_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_sweep");
    group.sample_size(20);
    let solver = SparseLu::default();
    let opts = SimOptions::default();

    for sections in [10, 100] {
        group.bench_with_input(
            BenchmarkId::from_parameter(sections),
            &sections,
            |bencher, &sections| {
                let mut ckt = ladder(sections, true);
                let output = format!("n{sections}");
                bencher.iter(|| {
                    let spec = TransferFunctionSpec::ac(
                        TransferOutput::voltage(output.as_str()),
                        "VIN",
                        FrequencySweep::decade(1e3, 1e9, 10),
                    );
                    let mut job =
                        SweepJob::begin(&mut ckt, &solver, spec, FixedOperatingPoint, &opts)
                            .unwrap();
                    job.run().unwrap();
                    black_box(job.finish())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_solve_dense,
    bench_solve_sparse_complex,
    bench_noise_sweep,
    bench_transfer_sweep
);
criterion_main!(benches);

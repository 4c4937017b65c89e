//! Transfer-function scenarios, DC and swept.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::DVector;
use num_complex::Complex;
use smallsig_core::{LinearSolver, NodeId, SparseMatrix};
use smallsig_devices::passive::{Capacitor, Resistor};
use smallsig_devices::sources::{CurrentSource, VoltageSource};
use smallsig_devices::{Circuit, Error as DeviceError};
use smallsig_solver::{
    Error, FixedOperatingPoint, FrequencySweep, SimOptions, SparseLu, SweepJob, SweepPoint,
    SweepStatus, TransferFunctionSpec, TransferOutput, TransferRow,
};

/// Counts complex and real solves on top of the stock LU.
#[derive(Default)]
struct CountingSolver {
    inner: SparseLu,
    solves: AtomicUsize,
}

impl CountingSolver {
    fn count(&self) -> usize {
        self.solves.load(Ordering::SeqCst)
    }
}

impl LinearSolver for CountingSolver {
    fn solve_real(
        &self,
        matrix: &SparseMatrix,
        rhs: &DVector<f64>,
    ) -> smallsig_core::Result<DVector<f64>> {
        self.solves.fetch_add(1, Ordering::SeqCst);
        self.inner.solve_real(matrix, rhs)
    }

    fn solve_complex(
        &self,
        matrix: &SparseMatrix,
        rhs: &DVector<Complex<f64>>,
    ) -> smallsig_core::Result<DVector<Complex<f64>>> {
        self.solves.fetch_add(1, Ordering::SeqCst);
        self.inner.solve_complex(matrix, rhs)
    }

    fn solve_complex_transposed(
        &self,
        matrix: &SparseMatrix,
        rhs: &DVector<Complex<f64>>,
    ) -> smallsig_core::Result<DVector<Complex<f64>>> {
        self.solves.fetch_add(1, Ordering::SeqCst);
        self.inner.solve_complex_transposed(matrix, rhs)
    }
}

fn divider(r1: f64, r2: f64) -> Circuit {
    let mut ckt = Circuit::new();
    let inp = ckt.node("in");
    let out = ckt.node("out");
    ckt.add(VoltageSource::new("V1", inp, NodeId::GROUND, 1.0));
    ckt.add(Resistor::new("R1", inp, out, r1));
    ckt.add(Resistor::new("R2", out, NodeId::GROUND, r2));
    ckt
}

fn run(
    circuit: &mut Circuit,
    solver: &dyn LinearSolver,
    spec: TransferFunctionSpec,
) -> Vec<TransferRow> {
    let opts = SimOptions::default();
    let mut job = SweepJob::begin(circuit, solver, spec, FixedOperatingPoint, &opts).unwrap();
    assert_eq!(job.run().unwrap(), SweepStatus::Done);
    job.finish()
}

fn assert_complex(actual: Complex<f64>, expected: Complex<f64>, rel: f64, what: &str) {
    assert!(
        (actual - expected).norm() <= rel * expected.norm(),
        "{}: {} vs {}",
        what,
        actual,
        expected
    );
}

#[test]
fn test_dc_divider() {
    let mut ckt = divider(1e3, 3e3);
    let rows = run(
        &mut ckt,
        &SparseLu::default(),
        TransferFunctionSpec::dc(TransferOutput::voltage("out"), "V1"),
    );
    assert_eq!(rows.len(), 1);
    let row = rows[0];
    assert!((row.gain.re - 0.75).abs() < 1e-12, "gain = {}", row.gain);
    assert!((row.input_impedance.re - 4000.0).abs() < 1e-8);
    assert!((row.output_impedance.re - 750.0).abs() < 1e-9);
    assert_eq!(row.gain.im, 0.0);
    assert_eq!(row.output_impedance.im, 0.0);
}

#[test]
fn test_differential_output() {
    let mut ckt = divider(1e3, 3e3);
    let rows = run(
        &mut ckt,
        &SparseLu::default(),
        TransferFunctionSpec::dc(TransferOutput::differential("in", "out"), "V1"),
    );
    let row = rows[0];
    assert!((row.gain.re - 0.25).abs() < 1e-12);
    // With V1 shorted, R1 and R2 both tie out to ground.
    assert!((row.output_impedance.re - 750.0).abs() < 1e-9);
}

#[test]
fn test_reciprocal_output_reuses_input_impedance() {
    let solver = CountingSolver::default();
    let mut ckt = divider(1e3, 3e3);
    let rows = run(
        &mut ckt,
        &solver,
        TransferFunctionSpec::dc(TransferOutput::current("v1"), "V1"),
    );
    let row = rows[0];
    assert_eq!(solver.count(), 1);
    assert_eq!(row.output_impedance, row.input_impedance);
    // Branch current flows into the positive terminal.
    assert!((row.gain.re + 1.0 / 4000.0).abs() < 1e-15);

    let solver = CountingSolver::default();
    let mut ckt = divider(1e3, 3e3);
    run(
        &mut ckt,
        &solver,
        TransferFunctionSpec::dc(TransferOutput::voltage("out"), "V1"),
    );
    assert_eq!(solver.count(), 2);
}

#[test]
fn test_current_output_through_second_source() {
    // V2 is a 0 V ammeter in series with R2.
    let mut ckt = Circuit::new();
    let inp = ckt.node("in");
    let out = ckt.node("out");
    let mid = ckt.node("mid");
    ckt.add(VoltageSource::new("V1", inp, NodeId::GROUND, 1.0));
    ckt.add(Resistor::new("R1", inp, out, 1e3));
    ckt.add(VoltageSource::new("V2", out, mid, 0.0));
    ckt.add(Resistor::new("R2", mid, NodeId::GROUND, 3e3));
    let rows = run(
        &mut ckt,
        &SparseLu::default(),
        TransferFunctionSpec::dc(TransferOutput::current("V2"), "V1"),
    );
    let row = rows[0];
    assert!((row.gain.re - 1.0 / 4000.0).abs() < 1e-15, "gain = {}", row.gain);
    // V2 sees R1 and R2 in series.
    assert!((row.output_impedance.re - 4000.0).abs() < 1e-8);
}

#[test]
fn test_current_source_input() {
    let r = 2.2e3;
    let mut ckt = Circuit::new();
    let a = ckt.node("a");
    ckt.add(CurrentSource::new("I1", a, NodeId::GROUND, 1e-3));
    ckt.add(Resistor::new("R1", a, NodeId::GROUND, r));
    let rows = run(
        &mut ckt,
        &SparseLu::default(),
        TransferFunctionSpec::dc(TransferOutput::voltage("a"), "I1"),
    );
    let row = rows[0];
    assert!((row.gain.re + r).abs() < 1e-9, "gain = {}", row.gain);
    assert!((row.input_impedance.re - r).abs() < 1e-9);
    assert!((row.output_impedance.re - r).abs() < 1e-9);
}

#[test]
fn test_ac_rc_lowpass() {
    let (r, c) = (1e3, 1e-6);
    let mut ckt = Circuit::new();
    let inp = ckt.node("in");
    let out = ckt.node("out");
    ckt.add(VoltageSource::new("V1", inp, NodeId::GROUND, 0.0).with_ac(1.0, 0.0));
    ckt.add(Resistor::new("R1", inp, out, r));
    ckt.add(Capacitor::new("C1", out, NodeId::GROUND, c));
    let rows = run(
        &mut ckt,
        &SparseLu::default(),
        TransferFunctionSpec::ac(
            TransferOutput::voltage("out"),
            "V1",
            FrequencySweep::decade(10.0, 1e5, 3),
        ),
    );
    assert_eq!(rows.len(), 13);

    for row in &rows {
        let jwrc = Complex::new(0.0, 2.0 * PI * row.value * r * c);
        let one = Complex::new(1.0, 0.0);
        assert_complex(row.gain, one / (one + jwrc), 1e-9, "gain");
        assert_complex(row.output_impedance, r / (one + jwrc), 1e-9, "zout");
        let zc = (Complex::new(0.0, 2.0 * PI * row.value * c)).inv();
        assert_complex(row.input_impedance, r + zc, 1e-9, "zin");
    }
}

#[test]
fn test_current_source_cannot_be_current_output() {
    let mut ckt = Circuit::new();
    let a = ckt.node("a");
    ckt.add(VoltageSource::new("V1", a, NodeId::GROUND, 1.0));
    ckt.add(CurrentSource::new("I1", a, NodeId::GROUND, 1e-3));
    let solver = SparseLu::default();
    let opts = SimOptions::default();
    let spec = TransferFunctionSpec::dc(TransferOutput::current("I1"), "V1");
    let err = SweepJob::begin(&mut ckt, &solver, spec, FixedOperatingPoint, &opts)
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidSweep(_)), "{}", err);
}

#[test]
fn test_unknown_input_source() {
    let mut ckt = divider(1e3, 1e3);
    let solver = SparseLu::default();
    let opts = SimOptions::default();
    let spec = TransferFunctionSpec::dc(TransferOutput::voltage("out"), "VX");
    let err = SweepJob::begin(&mut ckt, &solver, spec, FixedOperatingPoint, &opts)
        .err()
        .unwrap();
    assert!(matches!(err, Error::Devices(DeviceError::SourceUndefined(ref n)) if n == "VX"));
}

#[test]
fn test_parametric_dc_sweep() {
    let mut ckt = divider(1e3, 1e3);
    let solver = SparseLu::default();
    let opts = SimOptions::default();
    let spec = TransferFunctionSpec::dc(TransferOutput::voltage("out"), "V1")
        .with_dc_values(vec![1e3, 3e3, 9e3]);
    let provider = |ckt: &mut Circuit, p: &SweepPoint| -> smallsig_solver::Result<()> {
        let r2 = ckt
            .device_as_mut::<Resistor>("R2")
            .ok_or_else(|| Error::OperatingPoint("R2 missing".into()))?;
        r2.resistance = p.value;
        Ok(())
    };

    let mut job = SweepJob::begin(&mut ckt, &solver, spec, provider, &opts).unwrap();
    assert_eq!(job.run().unwrap(), SweepStatus::Done);
    let rows = job.finish();

    let expected = [0.5, 0.75, 0.9];
    for (row, want) in rows.iter().zip(expected) {
        assert!(
            (row.gain.re - want).abs() < 1e-12,
            "R2 = {}: gain {} expected {}",
            row.value,
            row.gain,
            want
        );
        let zout = 1e3 * row.value / (1e3 + row.value);
        assert!((row.output_impedance.re - zout).abs() < 1e-9);
    }
}

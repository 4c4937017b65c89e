//! Noise analysis scenarios.

use std::any::Any;

use num_complex::Complex;
use smallsig_core::{NodeId, PhysicalConstants, SparseMatrix};
use smallsig_devices::controlled::Vccs;
use smallsig_devices::passive::Resistor;
use smallsig_devices::sources::CurrentSource;
use smallsig_devices::{
    Circuit, Device, Error as DeviceError, LocalBlock, NoiseGenerator, NoiseKind, StampSet,
};
use smallsig_solver::{
    Error, FixedOperatingPoint, FrequencySweep, N_MINGAIN, NoiseMode, NoiseResult, NoiseSpec,
    SimOptions, SparseLu, SweepJob, SweepStatus,
};

/// A unit conductance to ground carrying one noise generator of any kind,
/// so the adjoint transfer from the generator to its own node is exactly 1.
#[derive(Debug)]
struct UnitProbe {
    name: String,
    node: NodeId,
    kind: NoiseKind,
    block: LocalBlock,
}

impl UnitProbe {
    fn new(name: &str, node: NodeId, kind: NoiseKind) -> Self {
        Self {
            name: name.to_string(),
            node,
            kind,
            block: LocalBlock::default(),
        }
    }

    fn stamp(&self, matrix: &mut SparseMatrix) {
        let mut set = StampSet::new();
        set.conductance(0, 1, 1.0);
        set.apply(&self.block, matrix);
    }
}

impl Device for UnitProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, matrix: &mut SparseMatrix) -> smallsig_devices::Result<()> {
        self.block = LocalBlock::new(vec![self.node, NodeId::GROUND]);
        self.block.bind_admittance(matrix, 0, 1)
    }

    fn ac_stamp(&mut self, matrix: &mut SparseMatrix, _omega: f64) {
        self.stamp(matrix);
    }

    fn pz_stamp(&self, matrix: &mut SparseMatrix, _s: Complex<f64>) {
        self.stamp(matrix);
    }

    fn noise_generators(&self, _frequency: f64) -> Vec<NoiseGenerator> {
        vec![NoiseGenerator {
            name: self.name.clone(),
            pos: self.node,
            neg: NodeId::GROUND,
            kind: self.kind,
        }]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn close(a: f64, b: f64, rel: f64) -> bool {
    (a - b).abs() <= rel * b.abs()
}

fn run(circuit: &mut Circuit, spec: NoiseSpec) -> NoiseResult {
    let solver = SparseLu::default();
    let opts = SimOptions::default();
    let mut job = SweepJob::begin(circuit, &solver, spec, FixedOperatingPoint, &opts).unwrap();
    assert_eq!(job.run().unwrap(), SweepStatus::Done);
    job.finish()
}

fn probe_circuit(kind: NoiseKind) -> Circuit {
    let mut ckt = Circuit::new();
    let a = ckt.node("a");
    ckt.add(CurrentSource::new("I1", a, NodeId::GROUND, 0.0));
    ckt.add(UnitProbe::new("P1", a, kind));
    ckt
}

#[test]
fn test_thermal_density_with_unit_gain() {
    let g_r = 2.5e-3;
    let mut ckt = probe_circuit(NoiseKind::Thermal { conductance: g_r });
    let result = run(
        &mut ckt,
        NoiseSpec::new("a", "I1", FrequencySweep::decade(10.0, 1e6, 5)),
    );

    let expected = PhysicalConstants::default().four_kt() * g_r;
    assert_eq!(result.rows.len(), 26);
    for row in &result.rows {
        assert!(
            close(row.output_density, expected, 1e-12),
            "at {} Hz: {} vs {}",
            row.frequency,
            row.output_density,
            expected
        );
        assert!(close(row.input_density, expected, 1e-12));
    }
    assert!(!result.gain_warning());
    assert!(result.integral.is_none());
}

#[test]
fn test_thermal_integral_over_band() {
    let g_r = 1e-3;
    let (f1, f2) = (1e3, 2e4);
    let mut ckt = probe_circuit(NoiseKind::Thermal { conductance: g_r });
    let result = run(
        &mut ckt,
        NoiseSpec::new("a", "I1", FrequencySweep::linear(f1, f2, 20))
            .with_mode(NoiseMode::Integrated),
    );

    let expected = PhysicalConstants::default().four_kt() * g_r * (f2 - f1);
    let integral = result.integral.unwrap();
    assert!(
        close(integral.output, expected, 1e-9),
        "integrated {} vs {}",
        integral.output,
        expected
    );
    assert!(close(integral.input, expected, 1e-9));
    assert!(close(integral.contributions[0], expected, 1e-9));
    assert!(result.rows.is_empty());
}

#[test]
fn test_uniform_density_integrates_flat() {
    let d = 7e-18;
    let intervals = 9;
    let df = 250.0;
    let mut ckt = probe_circuit(NoiseKind::GainOnly { density: d });
    let result = run(
        &mut ckt,
        NoiseSpec::new(
            "a",
            "I1",
            FrequencySweep::linear(100.0, 100.0 + intervals as f64 * df, intervals + 1),
        )
        .with_mode(NoiseMode::Integrated),
    );

    let expected = d * intervals as f64 * df;
    let total = result.integral.unwrap().output;
    assert!(close(total, expected, 1e-12), "{} vs {}", total, expected);
}

#[test]
fn test_shot_noise_uses_current_magnitude() {
    let current = -2e-3;
    let mut ckt = probe_circuit(NoiseKind::Shot { current });
    let result = run(
        &mut ckt,
        NoiseSpec::new("a", "I1", FrequencySweep::List(vec![1e3])),
    );
    let expected = PhysicalConstants::default().two_q() * 2e-3;
    assert!(close(result.rows[0].output_density, expected, 1e-12));
}

#[test]
fn test_resistor_output_and_input_referred() {
    let r = 1000.0;
    let mut ckt = Circuit::new();
    let a = ckt.node("a");
    ckt.add(CurrentSource::new("I1", a, NodeId::GROUND, 0.0));
    ckt.add(Resistor::new("R1", a, NodeId::GROUND, r));
    let result = run(
        &mut ckt,
        NoiseSpec::new("a", "I1", FrequencySweep::List(vec![1e3, 1e4])),
    );

    let four_kt = PhysicalConstants::default().four_kt();
    for row in &result.rows {
        // Voltage noise 4kTR at the output, current noise 4kT/R at the input.
        assert!(close(row.output_density, four_kt * r, 1e-9));
        assert!(close(row.input_density, four_kt / r, 1e-9));
    }
    assert_eq!(result.generator_index("R1"), Some(0));
}

#[test]
fn test_contributions_sum_to_total() {
    let mut ckt = Circuit::new();
    let a = ckt.node("a");
    let b = ckt.node("b");
    ckt.add(CurrentSource::new("I1", a, NodeId::GROUND, 0.0));
    ckt.add(Resistor::new("R1", a, b, 1000.0));
    ckt.add(Resistor::new("R2", b, NodeId::GROUND, 3000.0));
    ckt.add(Resistor::new("R3", a, NodeId::GROUND, 10e3));
    let result = run(
        &mut ckt,
        NoiseSpec::new("b", "I1", FrequencySweep::List(vec![1e3])),
    );

    let row = &result.rows[0];
    assert_eq!(row.contributions.len(), 3);
    let sum: f64 = row.contributions.iter().sum();
    assert!(close(sum, row.output_density, 1e-12));
    assert!(row.contributions.iter().all(|&c| c > 0.0));
}

fn gain_circuit(gm: f64) -> Circuit {
    let mut ckt = Circuit::new();
    let x = ckt.node("x");
    let out = ckt.node("out");
    ckt.add(CurrentSource::new("I1", x, NodeId::GROUND, 0.0));
    ckt.add(Resistor::new("RX", x, NodeId::GROUND, 1.0));
    ckt.add(Vccs::new("G1", out, NodeId::GROUND, x, NodeId::GROUND, gm));
    ckt.add(Resistor::new("RO", out, NodeId::GROUND, 1.0));
    ckt
}

#[test]
fn test_input_referral_above_gain_floor() {
    let gm = 1e-3;
    let mut ckt = gain_circuit(gm);
    let result = run(
        &mut ckt,
        NoiseSpec::new("out", "I1", FrequencySweep::List(vec![1e3, 1e5])),
    );
    for row in &result.rows {
        let expected = row.output_density / (gm * gm);
        assert!(
            close(row.input_density, expected, 1e-9),
            "{} vs {}",
            row.input_density,
            expected
        );
    }
    assert!(!result.gain_warning());
    assert!(result.gain_note().is_none());
}

#[test]
fn test_input_referral_below_gain_floor() {
    let mut ckt = gain_circuit(1e-12);
    let result = run(
        &mut ckt,
        NoiseSpec::new("out", "I1", FrequencySweep::List(vec![1e3, 1e5])),
    );
    for row in &result.rows {
        let expected = row.output_density / N_MINGAIN;
        assert!(close(row.input_density, expected, 1e-12));
    }
    assert!(result.gain_warning());
    assert_eq!(result.gain_floored_at, vec![1e3, 1e5]);
    assert!(result.gain_note().unwrap().contains("gain too small"));
}

#[test]
fn test_unresolved_names() {
    let mut ckt = probe_circuit(NoiseKind::Thermal { conductance: 1.0 });
    let solver = SparseLu::default();
    let opts = SimOptions::default();

    let spec = NoiseSpec::new("nowhere", "I1", FrequencySweep::List(vec![1.0]));
    let err = SweepJob::begin(&mut ckt, &solver, spec, FixedOperatingPoint, &opts)
        .err()
        .unwrap();
    assert!(matches!(err, Error::Devices(DeviceError::NodeUndefined(ref n)) if n == "nowhere"));

    let spec = NoiseSpec::new("a", "P1", FrequencySweep::List(vec![1.0]));
    let err = SweepJob::begin(&mut ckt, &solver, spec, FixedOperatingPoint, &opts)
        .err()
        .unwrap();
    assert!(matches!(err, Error::Devices(DeviceError::SourceUndefined(ref n)) if n == "P1"));
}

//! AC small-signal analysis.

use nalgebra::DVector;
use num_complex::Complex;
use smallsig_core::{LinearSolver, NodeId};
use smallsig_devices::Circuit;

use crate::error::Result;
use crate::options::SimOptions;
use crate::sweep::{AnalysisSpec, FrequencySweep, SweepAnalysis, SweepPoint};

/// AC sweep request. Every source's AC phasor drives the circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct AcSpec {
    pub sweep: FrequencySweep,
}

impl AcSpec {
    pub fn new(sweep: FrequencySweep) -> Self {
        Self { sweep }
    }
}

/// Solution at one frequency.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AcRow {
    /// Frequency (Hz).
    pub frequency: f64,
    /// Node voltages and branch currents, indexed by [`NodeId::index`].
    pub solution: Vec<Complex<f64>>,
}

impl AcRow {
    /// Value of one unknown; ground is zero.
    pub fn value(&self, node: NodeId) -> Complex<f64> {
        node.index()
            .and_then(|i| self.solution.get(i).copied())
            .unwrap_or_default()
    }
}

/// Result of an AC analysis.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AcResult {
    pub rows: Vec<AcRow>,
}

impl AcResult {
    pub fn frequencies(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.frequency).collect()
    }

    /// One unknown across the sweep.
    pub fn trace(&self, node: NodeId) -> Vec<Complex<f64>> {
        self.rows.iter().map(|r| r.value(node)).collect()
    }

    /// Magnitude in dB of `node` at every frequency.
    pub fn magnitude_db(&self, node: NodeId) -> Vec<f64> {
        self.trace(node)
            .iter()
            .map(|v| 20.0 * v.norm().log10())
            .collect()
    }

    /// Phase in degrees of `node` at every frequency.
    pub fn phase_deg(&self, node: NodeId) -> Vec<f64> {
        self.trace(node)
            .iter()
            .map(|v| v.arg().to_degrees())
            .collect()
    }
}

/// AC analysis resolved against a circuit.
#[derive(Debug, Clone)]
pub struct AcAnalysis {
    points: Vec<f64>,
    size: usize,
    rows: Vec<AcRow>,
}

impl AnalysisSpec for AcSpec {
    type Analysis = AcAnalysis;

    fn resolve(self, circuit: &mut Circuit, _options: &SimOptions) -> Result<AcAnalysis> {
        circuit.setup()?;
        Ok(AcAnalysis {
            points: self.sweep.points()?,
            size: circuit.size(),
            rows: Vec::new(),
        })
    }
}

impl SweepAnalysis for AcAnalysis {
    type Staged = DVector<Complex<f64>>;
    type Output = AcResult;

    fn points(&self) -> &[f64] {
        &self.points
    }

    fn angular_frequency(&self, point: &SweepPoint) -> f64 {
        point.omega()
    }

    fn output_shape(&self) -> (usize, usize) {
        (self.points.len(), self.size + 1)
    }

    fn compute(
        &self,
        circuit: &Circuit,
        solver: &dyn LinearSolver,
        _point: &SweepPoint,
    ) -> Result<DVector<Complex<f64>>> {
        let matrix = circuit.matrix()?;
        Ok(solver.solve_complex(matrix, &circuit.ac_excitation())?)
    }

    fn commit(&mut self, point: &SweepPoint, staged: DVector<Complex<f64>>) {
        self.rows.push(AcRow {
            frequency: point.value,
            solution: staged.iter().copied().collect(),
        });
    }

    fn results(&self) -> AcResult {
        AcResult {
            rows: self.rows.clone(),
        }
    }
}

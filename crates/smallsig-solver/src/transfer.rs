//! Transfer-function analysis: gain, input impedance and output impedance.
//!
//! Each point runs one solve with a unit excitation at the input source and,
//! unless the output is the input source's own current, a second solve with
//! a unit excitation at the output. DC mode solves the real part of the
//! matrix stamped at zero frequency; frequency mode solves the full complex
//! system at each swept frequency.

use log::debug;
use nalgebra::DVector;
use num_complex::Complex;
use num_traits::Zero;
use smallsig_core::{LinearSolver, NodeId};
use smallsig_devices::{Circuit, SourceInfo};

use crate::error::{Error, Result};
use crate::options::SimOptions;
use crate::sweep::{AnalysisSpec, FrequencySweep, SweepAnalysis, SweepPoint};

/// Branch currents smaller than this report [`OPEN_IMPEDANCE`].
const MIN_BRANCH_CURRENT: f64 = 1e-20;

/// Impedance reported for a source that draws no current.
pub const OPEN_IMPEDANCE: f64 = 1e20;

/// Quantity whose ratio to the input excitation is measured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutput {
    /// `V(pos) - V(neg)`; `neg` is ground when `None`.
    Voltage { pos: String, neg: Option<String> },
    /// Branch current of a voltage source.
    SourceCurrent(String),
}

impl TransferOutput {
    pub fn voltage(pos: impl Into<String>) -> Self {
        TransferOutput::Voltage {
            pos: pos.into(),
            neg: None,
        }
    }

    pub fn differential(pos: impl Into<String>, neg: impl Into<String>) -> Self {
        TransferOutput::Voltage {
            pos: pos.into(),
            neg: Some(neg.into()),
        }
    }

    pub fn current(source: impl Into<String>) -> Self {
        TransferOutput::SourceCurrent(source.into())
    }
}

/// How the analysis steps.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferMode {
    /// Real solves at zero frequency, one per parameter value. The values
    /// are handed to the operating-point provider.
    Dc(Vec<f64>),
    /// Complex solves at each swept frequency.
    Frequency(FrequencySweep),
}

/// Transfer-function request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunctionSpec {
    pub output: TransferOutput,
    /// Independent source carrying the input excitation.
    pub input: String,
    pub mode: TransferMode,
}

impl TransferFunctionSpec {
    /// Single DC point.
    pub fn dc(output: TransferOutput, input: impl Into<String>) -> Self {
        Self {
            output,
            input: input.into(),
            mode: TransferMode::Dc(vec![0.0]),
        }
    }

    /// Frequency sweep.
    pub fn ac(output: TransferOutput, input: impl Into<String>, sweep: FrequencySweep) -> Self {
        Self {
            output,
            input: input.into(),
            mode: TransferMode::Frequency(sweep),
        }
    }

    /// Parametric DC sweep.
    pub fn with_dc_values(mut self, values: Vec<f64>) -> Self {
        self.mode = TransferMode::Dc(values);
        self
    }
}

/// Gain and impedances at one point. DC rows carry zero imaginary parts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TransferRow {
    /// Swept value: parameter for DC, frequency (Hz) otherwise.
    pub value: f64,
    pub gain: Complex<f64>,
    pub input_impedance: Complex<f64>,
    pub output_impedance: Complex<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ResolvedOutput {
    Voltage { pos: NodeId, neg: NodeId },
    Current { source: SourceInfo, branch: NodeId },
}

/// Transfer-function analysis resolved against a circuit.
#[derive(Debug, Clone)]
pub struct TransferAnalysis {
    input: SourceInfo,
    output: ResolvedOutput,
    /// Output is the input source's own current.
    reciprocal: bool,
    dc: bool,
    points: Vec<f64>,
    rows: Vec<TransferRow>,
}

impl AnalysisSpec for TransferFunctionSpec {
    type Analysis = TransferAnalysis;

    fn resolve(self, circuit: &mut Circuit, _options: &SimOptions) -> Result<TransferAnalysis> {
        circuit.setup()?;
        let input = circuit.find_source(&self.input)?;
        let (output, reciprocal) = match &self.output {
            TransferOutput::Voltage { pos, neg } => {
                let pos = circuit.find_node(pos)?;
                let neg = match neg {
                    Some(name) => circuit.find_node(name)?,
                    None => NodeId::GROUND,
                };
                (ResolvedOutput::Voltage { pos, neg }, false)
            }
            TransferOutput::SourceCurrent(name) => {
                let source = circuit.find_source(name)?;
                let branch = source.branch().ok_or_else(|| {
                    Error::InvalidSweep(format!("output source {name} has no branch current"))
                })?;
                let reciprocal = name.eq_ignore_ascii_case(&self.input);
                (ResolvedOutput::Current { source, branch }, reciprocal)
            }
        };
        let (dc, points) = match self.mode {
            TransferMode::Dc(values) => (true, FrequencySweep::List(values).points()?),
            TransferMode::Frequency(sweep) => (false, sweep.points()?),
        };
        Ok(TransferAnalysis {
            input,
            output,
            reciprocal,
            dc,
            points,
            rows: Vec::new(),
        })
    }
}

fn at(x: &DVector<Complex<f64>>, node: NodeId) -> Complex<f64> {
    node.index().map_or_else(Complex::zero, |i| x[i])
}

/// `-1 / I`, the impedance seen by a unit voltage excitation.
fn driven_impedance(current: Complex<f64>) -> Complex<f64> {
    if current.norm() < MIN_BRANCH_CURRENT {
        Complex::new(OPEN_IMPEDANCE, 0.0)
    } else {
        -current.inv()
    }
}

impl TransferAnalysis {
    /// Whether the output impedance is taken from the input solve.
    pub fn is_reciprocal(&self) -> bool {
        self.reciprocal
    }

    fn solve(
        &self,
        circuit: &Circuit,
        solver: &dyn LinearSolver,
        rhs: &DVector<Complex<f64>>,
    ) -> Result<DVector<Complex<f64>>> {
        let matrix = circuit.matrix()?;
        if self.dc {
            let real = rhs.map(|z| z.re);
            let x = solver.solve_real(matrix, &real)?;
            Ok(x.map(|v| Complex::new(v, 0.0)))
        } else {
            Ok(solver.solve_complex(matrix, rhs)?)
        }
    }

    fn input_impedance(&self, x: &DVector<Complex<f64>>) -> Complex<f64> {
        match self.input.branch() {
            Some(branch) => driven_impedance(at(x, branch)),
            None => at(x, self.input.neg) - at(x, self.input.pos),
        }
    }
}

impl SweepAnalysis for TransferAnalysis {
    type Staged = TransferRow;
    type Output = Vec<TransferRow>;

    fn points(&self) -> &[f64] {
        &self.points
    }

    fn angular_frequency(&self, point: &SweepPoint) -> f64 {
        if self.dc { 0.0 } else { point.omega() }
    }

    fn output_shape(&self) -> (usize, usize) {
        (self.points.len(), 4)
    }

    fn compute(
        &self,
        circuit: &Circuit,
        solver: &dyn LinearSolver,
        point: &SweepPoint,
    ) -> Result<TransferRow> {
        let size = circuit.size();
        let one = Complex::new(1.0, 0.0);

        let mut rhs = DVector::from_element(size, Complex::zero());
        self.input.excite(&mut rhs, one);
        let x = self.solve(circuit, solver, &rhs)?;

        let gain = match self.output {
            ResolvedOutput::Voltage { pos, neg } => at(&x, pos) - at(&x, neg),
            ResolvedOutput::Current { branch, .. } => at(&x, branch),
        };
        let input_impedance = self.input_impedance(&x);

        let output_impedance = if self.reciprocal {
            input_impedance
        } else {
            let mut rhs = DVector::from_element(size, Complex::zero());
            match self.output {
                ResolvedOutput::Voltage { pos, neg } => {
                    if let Some(i) = pos.index() {
                        rhs[i] -= one;
                    }
                    if let Some(i) = neg.index() {
                        rhs[i] += one;
                    }
                    let y = self.solve(circuit, solver, &rhs)?;
                    at(&y, neg) - at(&y, pos)
                }
                ResolvedOutput::Current { source, branch } => {
                    source.excite(&mut rhs, one);
                    let y = self.solve(circuit, solver, &rhs)?;
                    driven_impedance(at(&y, branch))
                }
            }
        };

        debug!(
            "transfer at {:.6e}: gain {}, zin {}, zout {}",
            point.value, gain, input_impedance, output_impedance
        );
        Ok(TransferRow {
            value: point.value,
            gain,
            input_impedance,
            output_impedance,
        })
    }

    fn commit(&mut self, _point: &SweepPoint, staged: TransferRow) {
        self.rows.push(staged);
    }

    fn results(&self) -> Vec<TransferRow> {
        self.rows.clone()
    }
}

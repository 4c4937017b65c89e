//! Noise sweep: adjoint transfer, generator evaluation and accumulation.

use log::{info, warn};
use nalgebra::DVector;
use num_complex::Complex;
use num_traits::Zero;
use smallsig_core::{LinearSolver, NodeId, PhysicalConstants};
use smallsig_devices::{Circuit, NoiseKind, SourceInfo};

use super::integrate::{N_MINGAIN, NoiseIntegrator};
use crate::error::{Error, Result};
use crate::options::SimOptions;
use crate::sweep::{AnalysisSpec, FrequencySweep, SweepAnalysis, SweepPoint};

/// Spectral rows or a single integrated summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NoiseMode {
    /// One row per frequency.
    #[default]
    Density,
    /// Integrate over the sweep and report totals at the end.
    Integrated,
}

/// Noise analysis request.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseSpec {
    /// Output node name.
    pub output: String,
    /// Reference node name, ground when `None`.
    pub reference: Option<String>,
    /// Independent source the noise is referred to.
    pub input_source: String,
    pub sweep: FrequencySweep,
    pub mode: NoiseMode,
}

impl NoiseSpec {
    pub fn new(
        output: impl Into<String>,
        input_source: impl Into<String>,
        sweep: FrequencySweep,
    ) -> Self {
        Self {
            output: output.into(),
            reference: None,
            input_source: input_source.into(),
            sweep,
            mode: NoiseMode::Density,
        }
    }

    /// Measure `V(output) - V(reference)` instead of `V(output)`.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_mode(mut self, mode: NoiseMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Densities at one frequency.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NoiseRow {
    /// Frequency (Hz).
    pub frequency: f64,
    /// Total output noise density (V²/Hz).
    pub output_density: f64,
    /// Input-referred density (units of the input source squared per Hz).
    pub input_density: f64,
    /// Output density contributed by each generator, in generator order.
    pub contributions: Vec<f64>,
}

/// Integrated noise over the swept band.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NoiseIntegral {
    /// Total integrated output noise (V²).
    pub output: f64,
    /// Total integrated input-referred noise.
    pub input: f64,
    /// Integrated output noise per generator.
    pub contributions: Vec<f64>,
}

impl NoiseIntegral {
    /// RMS output noise.
    pub fn output_rms(&self) -> f64 {
        self.output.sqrt()
    }

    /// RMS input-referred noise.
    pub fn input_rms(&self) -> f64 {
        self.input.sqrt()
    }
}

/// Noise results accumulated so far.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NoiseResult {
    pub mode: NoiseMode,
    /// Generator names, one per contribution column.
    pub generators: Vec<String>,
    /// Spectral rows (density mode only).
    pub rows: Vec<NoiseRow>,
    /// Running totals (integrated mode only).
    pub integral: Option<NoiseIntegral>,
    /// Frequencies at which the input gain fell below [`N_MINGAIN`] and the
    /// input-referred density was computed with the floored gain.
    pub gain_floored_at: Vec<f64>,
}

impl NoiseResult {
    /// True when any input-referred value used the gain floor.
    pub fn gain_warning(&self) -> bool {
        !self.gain_floored_at.is_empty()
    }

    /// Human-readable note for the gain floor, if it was hit.
    pub fn gain_note(&self) -> Option<String> {
        self.gain_floored_at.first().map(|f| {
            format!(
                "gain too small at {} frequencies (first at {:.6e} Hz), input noise referred through {:e}",
                self.gain_floored_at.len(),
                f,
                N_MINGAIN
            )
        })
    }

    /// Index of a generator's contribution column.
    pub fn generator_index(&self, name: &str) -> Option<usize> {
        self.generators.iter().position(|g| g == name)
    }
}

/// Everything one frequency contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct NoisePoint {
    pub frequency: f64,
    pub output_density: f64,
    pub input_density: f64,
    pub contributions: Vec<f64>,
    /// Input gain `|Vout / Vin|²` before flooring.
    pub gain: f64,
}

/// Resumable accumulator state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoiseSweepState {
    pub output: NoiseIntegrator,
    pub input: NoiseIntegrator,
    pub generators: Vec<NoiseIntegrator>,
}

impl NoiseSweepState {
    fn new(generators: usize) -> Self {
        Self {
            output: NoiseIntegrator::new(),
            input: NoiseIntegrator::new(),
            generators: vec![NoiseIntegrator::new(); generators],
        }
    }

    /// Frequency of the last committed point.
    pub fn last_frequency(&self) -> Option<f64> {
        self.output.last_frequency()
    }
}

/// Noise analysis resolved against a circuit.
#[derive(Debug, Clone)]
pub struct NoiseAnalysis {
    output: NodeId,
    reference: NodeId,
    input: SourceInfo,
    constants: PhysicalConstants,
    mode: NoiseMode,
    points: Vec<f64>,
    generators: Vec<String>,
    rows: Vec<NoiseRow>,
    state: NoiseSweepState,
    gain_floored_at: Vec<f64>,
}

impl AnalysisSpec for NoiseSpec {
    type Analysis = NoiseAnalysis;

    fn resolve(self, circuit: &mut Circuit, options: &SimOptions) -> Result<NoiseAnalysis> {
        circuit.setup()?;
        let output = circuit.find_node(&self.output)?;
        let reference = match &self.reference {
            Some(name) => circuit.find_node(name)?,
            None => NodeId::GROUND,
        };
        let input = circuit.find_source(&self.input_source)?;
        let points = self.sweep.points()?;
        let generators: Vec<String> = circuit
            .noise_generators(points[0])
            .into_iter()
            .map(|g| g.name)
            .collect();

        let mut analysis = NoiseAnalysis::new(output, reference, input, options.constants());
        analysis.mode = self.mode;
        analysis.state = NoiseSweepState::new(generators.len());
        analysis.generators = generators;
        analysis.points = points;
        Ok(analysis)
    }
}

impl NoiseAnalysis {
    fn new(
        output: NodeId,
        reference: NodeId,
        input: SourceInfo,
        constants: PhysicalConstants,
    ) -> Self {
        Self {
            output,
            reference,
            input,
            constants,
            mode: NoiseMode::Density,
            points: Vec::new(),
            generators: Vec::new(),
            rows: Vec::new(),
            state: NoiseSweepState::default(),
            gain_floored_at: Vec::new(),
        }
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    pub fn state(&self) -> &NoiseSweepState {
        &self.state
    }

    fn differential(&self, x: &DVector<Complex<f64>>) -> Complex<f64> {
        voltage(x, self.output) - voltage(x, self.reference)
    }

    /// Noise at one frequency against the current matrix contents.
    pub fn evaluate(
        &self,
        circuit: &Circuit,
        solver: &dyn LinearSolver,
        frequency: f64,
    ) -> Result<NoisePoint> {
        let matrix = circuit.matrix()?;
        let size = circuit.size();

        // Adjoint system: unit excitation at the output pair gives the
        // transfer from every node pair to the output in one solve.
        let mut rhs = DVector::from_element(size, Complex::zero());
        if let Some(i) = self.output.index() {
            rhs[i] += Complex::new(1.0, 0.0);
        }
        if let Some(i) = self.reference.index() {
            rhs[i] -= Complex::new(1.0, 0.0);
        }
        let adjoint = solver.solve_complex_transposed(matrix, &rhs)?;

        let mut rhs = DVector::from_element(size, Complex::zero());
        self.input.excite(&mut rhs, Complex::new(1.0, 0.0));
        let forward = solver.solve_complex(matrix, &rhs)?;
        let gain = self.differential(&forward).norm_sqr();

        let generators = circuit.noise_generators(frequency);
        if generators.len() != self.generators.len() {
            return Err(Error::InvalidSweep(format!(
                "noise generator set changed at {frequency} Hz: {} instead of {}",
                generators.len(),
                self.generators.len()
            )));
        }
        let contributions: Vec<f64> = generators
            .iter()
            .map(|g| {
                let transfer = (voltage(&adjoint, g.pos) - voltage(&adjoint, g.neg)).norm_sqr();
                match g.kind {
                    NoiseKind::Shot { current } => {
                        transfer * self.constants.two_q() * current.abs()
                    }
                    NoiseKind::Thermal { conductance } => {
                        transfer * self.constants.four_kt() * conductance
                    }
                    NoiseKind::GainOnly { density } => transfer * density,
                }
            })
            .collect();

        let output_density: f64 = contributions.iter().sum();
        Ok(NoisePoint {
            frequency,
            output_density,
            input_density: output_density / gain.max(N_MINGAIN),
            contributions,
            gain,
        })
    }
}

fn voltage(x: &DVector<Complex<f64>>, node: NodeId) -> Complex<f64> {
    node.index().map_or_else(Complex::zero, |i| x[i])
}

impl SweepAnalysis for NoiseAnalysis {
    type Staged = NoisePoint;
    type Output = NoiseResult;

    fn points(&self) -> &[f64] {
        &self.points
    }

    fn angular_frequency(&self, point: &SweepPoint) -> f64 {
        point.omega()
    }

    fn output_shape(&self) -> (usize, usize) {
        let columns = 3 + self.generators.len();
        match self.mode {
            NoiseMode::Density => (self.points.len(), columns),
            NoiseMode::Integrated => (1, columns),
        }
    }

    fn compute(
        &self,
        circuit: &Circuit,
        solver: &dyn LinearSolver,
        point: &SweepPoint,
    ) -> Result<NoisePoint> {
        self.evaluate(circuit, solver, point.value)
    }

    fn commit(&mut self, _point: &SweepPoint, staged: NoisePoint) {
        if staged.gain < N_MINGAIN {
            if self.gain_floored_at.is_empty() {
                warn!(
                    "noise gain {:e} below {:e} at {:.6e} Hz, input noise uses the floor",
                    staged.gain, N_MINGAIN, staged.frequency
                );
            }
            self.gain_floored_at.push(staged.frequency);
        }
        let f = staged.frequency;
        self.state.output.add(f, staged.output_density);
        self.state.input.add(f, staged.input_density);
        for (acc, &density) in self.state.generators.iter_mut().zip(&staged.contributions) {
            acc.add(f, density);
        }
        if self.mode == NoiseMode::Density {
            self.rows.push(NoiseRow {
                frequency: f,
                output_density: staged.output_density,
                input_density: staged.input_density,
                contributions: staged.contributions,
            });
        }
    }

    fn finish(&mut self) {
        if self.mode == NoiseMode::Integrated {
            info!(
                "integrated noise: output {:.6e} V rms, input {:.6e} rms",
                self.state.output.total().sqrt(),
                self.state.input.total().sqrt()
            );
        }
    }

    fn results(&self) -> NoiseResult {
        let integral = (self.mode == NoiseMode::Integrated).then(|| NoiseIntegral {
            output: self.state.output.total(),
            input: self.state.input.total(),
            contributions: self.state.generators.iter().map(|g| g.total()).collect(),
        });
        NoiseResult {
            mode: self.mode,
            generators: self.generators.clone(),
            rows: self.rows.clone(),
            integral,
            gain_floored_at: self.gain_floored_at.clone(),
        }
    }
}

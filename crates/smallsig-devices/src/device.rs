//! The linearization contract every device implements.

use std::any::Any;
use std::fmt;
use std::ops::{AddAssign, SubAssign};

use nalgebra::{DVector, Scalar};
use num_complex::Complex;
use smallsig_core::{EquationTable, NodeId, SparseMatrix};

use crate::error::Result;
use crate::noise::NoiseGenerator;
use crate::shadow::AdjointShadow;

/// A circuit element that can be linearized into the admittance matrix.
///
/// The load-time methods read the device's current operating point; they
/// never re-evaluate device physics. Callers must clear the matrix once per
/// sweep point before any device stamps into it.
pub trait Device: Send + fmt::Debug {
    /// Instance name (e.g. `"M1"`).
    fn name(&self) -> &str;

    /// Create internal nodes and branch unknowns. Called once, before the
    /// matrix is sized.
    fn declare(&mut self, _equations: &mut EquationTable) -> Result<()> {
        Ok(())
    }

    /// Bind every matrix location the device will ever stamp.
    fn setup(&mut self, matrix: &mut SparseMatrix) -> Result<()>;

    /// Stamp the small-signal admittance at angular frequency `omega`.
    ///
    /// Devices that own an adjoint shadow restamp it with the same values.
    fn ac_stamp(&mut self, matrix: &mut SparseMatrix, omega: f64);

    /// Stamp the reduced admittance at complex frequency `s` for pole-zero
    /// analysis. Never touches an adjoint shadow.
    fn pz_stamp(&self, matrix: &mut SparseMatrix, s: Complex<f64>);

    /// Local convergence predicate against the latest Newton iterate.
    ///
    /// On failure the device bumps the shared counter and returns `false`
    /// without running any further checks it owns.
    fn convergence_check(&self, _ctx: &mut ConvergenceContext<'_>) -> bool {
        true
    }

    /// Shrink `step` to what the device's charge histories allow.
    fn truncation_step(&self, _estimator: &dyn TruncationEstimator, step: f64) -> f64 {
        step
    }

    /// Noise generators at `frequency` (Hz).
    fn noise_generators(&self, _frequency: f64) -> Vec<NoiseGenerator> {
        Vec::new()
    }

    /// Excitation description for independent sources.
    fn source(&self) -> Option<SourceInfo> {
        None
    }

    /// The adjoint shadow, if the device keeps one.
    fn shadow(&self) -> Option<&AdjointShadow> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// How a source injects its excitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Voltage source with a branch-current unknown.
    Voltage { branch: NodeId },
    /// Current source from `pos` through the source to `neg`.
    Current,
}

/// Terminals, kind and AC value of an independent source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    pub pos: NodeId,
    pub neg: NodeId,
    pub kind: SourceKind,
    /// Phasor used by AC and noise-input excitation.
    pub ac: Complex<f64>,
}

impl SourceInfo {
    /// Add `amount` units of this source's excitation to `rhs`.
    ///
    /// A voltage source drives its branch equation; a current source pulls
    /// current out of `pos` and pushes it into `neg`.
    pub fn excite<T>(&self, rhs: &mut DVector<T>, amount: T)
    where
        T: Scalar + Copy + AddAssign + SubAssign,
    {
        match self.kind {
            SourceKind::Voltage { branch } => {
                if let Some(i) = branch.index() {
                    rhs[i] += amount;
                }
            }
            SourceKind::Current => {
                if let Some(i) = self.pos.index() {
                    rhs[i] -= amount;
                }
                if let Some(i) = self.neg.index() {
                    rhs[i] += amount;
                }
            }
        }
    }

    /// Branch unknown of a voltage source.
    pub fn branch(&self) -> Option<NodeId> {
        match self.kind {
            SourceKind::Voltage { branch } => Some(branch),
            SourceKind::Current => None,
        }
    }
}

/// State shared by one circuit-wide convergence pass.
#[derive(Debug)]
pub struct ConvergenceContext<'a> {
    solution: &'a DVector<f64>,
    pub reltol: f64,
    pub abstol: f64,
    noncon: usize,
}

impl<'a> ConvergenceContext<'a> {
    pub fn new(solution: &'a DVector<f64>, reltol: f64, abstol: f64) -> Self {
        Self {
            solution,
            reltol,
            abstol,
            noncon: 0,
        }
    }

    /// Voltage (or branch current) of an unknown in the latest iterate.
    pub fn value(&self, node: NodeId) -> f64 {
        node.index()
            .and_then(|i| self.solution.get(i).copied())
            .unwrap_or(0.0)
    }

    /// `reltol * max(|a|, |b|) + abstol`.
    pub fn tolerance(&self, a: f64, b: f64) -> f64 {
        self.reltol * a.abs().max(b.abs()) + self.abstol
    }

    /// Record one non-converged device.
    pub fn flag_nonconvergence(&mut self) {
        self.noncon += 1;
    }

    pub fn nonconvergence_count(&self) -> usize {
        self.noncon
    }
}

/// Charge and companion-current history of one state variable.
///
/// Index 0 is the newest time point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChargeHistory {
    pub charge: [f64; 4],
    pub current: [f64; 2],
}

impl ChargeHistory {
    /// Shift in a newly accepted time point.
    pub fn push(&mut self, charge: f64, current: f64) {
        self.charge.copy_within(0..3, 1);
        self.charge[0] = charge;
        self.current[1] = self.current[0];
        self.current[0] = current;
    }
}

/// Local truncation-error estimator invoked once per tracked charge.
pub trait TruncationEstimator {
    /// Largest step the history allows.
    fn max_step(&self, history: &ChargeHistory) -> f64;
}

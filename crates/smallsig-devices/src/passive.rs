//! Linear passive elements: R, C, L.

use std::any::Any;

use num_complex::Complex;
use smallsig_core::{EquationTable, NodeId, SparseMatrix};

use crate::device::{ChargeHistory, Device, TruncationEstimator};
use crate::error::{Error, Result};
use crate::noise::NoiseGenerator;
use crate::stamp::{LocalBlock, StampSet};

fn positive(device: &str, parameter: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            device: device.to_string(),
            parameter,
            reason: format!("{value} must be positive"),
        })
    }
}

fn two_terminal(
    block: &mut LocalBlock,
    matrix: &mut SparseMatrix,
    pos: NodeId,
    neg: NodeId,
) -> Result<()> {
    *block = LocalBlock::new(vec![pos, neg]);
    block.bind_admittance(matrix, 0, 1)
}

// ────────────────────── Resistor ──────────────────────

/// Resistor with thermal noise.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub name: String,
    pub pos: NodeId,
    pub neg: NodeId,
    /// Resistance in ohms.
    pub resistance: f64,
    block: LocalBlock,
}

impl Resistor {
    pub fn new(name: impl Into<String>, pos: NodeId, neg: NodeId, resistance: f64) -> Self {
        Self {
            name: name.into(),
            pos,
            neg,
            resistance,
            block: LocalBlock::default(),
        }
    }

    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }
}

impl Device for Resistor {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, matrix: &mut SparseMatrix) -> Result<()> {
        positive(&self.name, "r", self.resistance)?;
        two_terminal(&mut self.block, matrix, self.pos, self.neg)
    }

    fn ac_stamp(&mut self, matrix: &mut SparseMatrix, _omega: f64) {
        let mut set = StampSet::with_capacity(4);
        set.conductance(0, 1, self.conductance());
        set.apply(&self.block, matrix);
    }

    fn pz_stamp(&self, matrix: &mut SparseMatrix, _s: Complex<f64>) {
        let mut set = StampSet::with_capacity(4);
        set.conductance(0, 1, self.conductance());
        set.apply(&self.block, matrix);
    }

    fn noise_generators(&self, _frequency: f64) -> Vec<NoiseGenerator> {
        vec![NoiseGenerator::thermal(
            self.name.clone(),
            self.pos,
            self.neg,
            self.conductance(),
        )]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ────────────────────── Capacitor ──────────────────────

#[derive(Debug, Clone)]
pub struct Capacitor {
    pub name: String,
    pub pos: NodeId,
    pub neg: NodeId,
    /// Capacitance in farads.
    pub capacitance: f64,
    /// Charge history for truncation control.
    pub history: ChargeHistory,
    block: LocalBlock,
}

impl Capacitor {
    pub fn new(name: impl Into<String>, pos: NodeId, neg: NodeId, capacitance: f64) -> Self {
        Self {
            name: name.into(),
            pos,
            neg,
            capacitance,
            history: ChargeHistory::default(),
            block: LocalBlock::default(),
        }
    }

    fn stamp(&self, matrix: &mut SparseMatrix, s: Complex<f64>) {
        let mut set = StampSet::with_capacity(4);
        set.admittance(0, 1, s * self.capacitance);
        set.apply(&self.block, matrix);
    }
}

impl Device for Capacitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, matrix: &mut SparseMatrix) -> Result<()> {
        positive(&self.name, "c", self.capacitance)?;
        two_terminal(&mut self.block, matrix, self.pos, self.neg)
    }

    fn ac_stamp(&mut self, matrix: &mut SparseMatrix, omega: f64) {
        self.stamp(matrix, Complex::new(0.0, omega));
    }

    fn pz_stamp(&self, matrix: &mut SparseMatrix, s: Complex<f64>) {
        self.stamp(matrix, s);
    }

    fn truncation_step(&self, estimator: &dyn TruncationEstimator, step: f64) -> f64 {
        step.min(estimator.max_step(&self.history))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ────────────────────── Inductor ──────────────────────

/// Inductor with a branch-current unknown.
#[derive(Debug, Clone)]
pub struct Inductor {
    pub name: String,
    pub pos: NodeId,
    pub neg: NodeId,
    /// Inductance in henries.
    pub inductance: f64,
    /// Flux history for truncation control.
    pub history: ChargeHistory,
    branch: NodeId,
    block: LocalBlock,
}

impl Inductor {
    pub fn new(name: impl Into<String>, pos: NodeId, neg: NodeId, inductance: f64) -> Self {
        Self {
            name: name.into(),
            pos,
            neg,
            inductance,
            history: ChargeHistory::default(),
            branch: NodeId::GROUND,
            block: LocalBlock::default(),
        }
    }

    /// Branch-current unknown, valid after the circuit is set up.
    pub fn branch(&self) -> NodeId {
        self.branch
    }

    fn stamp(&self, matrix: &mut SparseMatrix, s: Complex<f64>) {
        let mut set = StampSet::with_capacity(5);
        branch_incidence(&mut set);
        set.add(2, 2, -s * self.inductance);
        set.apply(&self.block, matrix);
    }
}

/// `+1/-1` coupling between ports 0/1 and the branch unknown on port 2.
pub(crate) fn branch_incidence(set: &mut StampSet) {
    set.add_real(0, 2, 1.0);
    set.add_real(1, 2, -1.0);
    set.add_real(2, 0, 1.0);
    set.add_real(2, 1, -1.0);
}

pub(crate) fn bind_branch(block: &mut LocalBlock, matrix: &mut SparseMatrix) -> Result<()> {
    for (r, c) in [(0, 2), (1, 2), (2, 0), (2, 1), (2, 2)] {
        block.bind(matrix, r, c)?;
    }
    Ok(())
}

impl Device for Inductor {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare(&mut self, equations: &mut EquationTable) -> Result<()> {
        self.branch = equations.branch(&format!("{}#branch", self.name))?;
        Ok(())
    }

    fn setup(&mut self, matrix: &mut SparseMatrix) -> Result<()> {
        positive(&self.name, "l", self.inductance)?;
        self.block = LocalBlock::new(vec![self.pos, self.neg, self.branch]);
        bind_branch(&mut self.block, matrix)
    }

    fn ac_stamp(&mut self, matrix: &mut SparseMatrix, omega: f64) {
        self.stamp(matrix, Complex::new(0.0, omega));
    }

    fn pz_stamp(&self, matrix: &mut SparseMatrix, s: Complex<f64>) {
        self.stamp(matrix, s);
    }

    fn truncation_step(&self, estimator: &dyn TruncationEstimator, step: f64) -> f64 {
        step.min(estimator.max_step(&self.history))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

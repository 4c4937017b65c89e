//! Independent sources.
//!
//! Sources contribute no admittance of their own except the branch coupling
//! of a voltage source. Their excitation reaches the right-hand side through
//! [`SourceInfo::excite`].

use std::any::Any;

use num_complex::Complex;
use smallsig_core::{EquationTable, NodeId, SparseMatrix};

use crate::device::{Device, SourceInfo, SourceKind};
use crate::error::Result;
use crate::passive::{bind_branch, branch_incidence};
use crate::stamp::{LocalBlock, StampSet};

/// AC magnitude and phase (degrees) as a phasor.
fn phasor(magnitude: f64, phase_deg: f64) -> Complex<f64> {
    Complex::from_polar(magnitude, phase_deg.to_radians())
}

/// Independent voltage source with a branch-current unknown.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub name: String,
    pub pos: NodeId,
    pub neg: NodeId,
    /// DC value (V), read by operating-point providers.
    pub dc: f64,
    pub ac_magnitude: f64,
    /// AC phase in degrees.
    pub ac_phase: f64,
    branch: NodeId,
    block: LocalBlock,
}

impl VoltageSource {
    pub fn new(name: impl Into<String>, pos: NodeId, neg: NodeId, dc: f64) -> Self {
        Self {
            name: name.into(),
            pos,
            neg,
            dc,
            ac_magnitude: 0.0,
            ac_phase: 0.0,
            branch: NodeId::GROUND,
            block: LocalBlock::default(),
        }
    }

    pub fn with_ac(mut self, magnitude: f64, phase_deg: f64) -> Self {
        self.ac_magnitude = magnitude;
        self.ac_phase = phase_deg;
        self
    }

    pub fn branch(&self) -> NodeId {
        self.branch
    }

    fn stamp(&self, matrix: &mut SparseMatrix) {
        let mut set = StampSet::with_capacity(4);
        branch_incidence(&mut set);
        set.apply(&self.block, matrix);
    }
}

impl Device for VoltageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare(&mut self, equations: &mut EquationTable) -> Result<()> {
        self.branch = equations.branch(&format!("{}#branch", self.name))?;
        Ok(())
    }

    fn setup(&mut self, matrix: &mut SparseMatrix) -> Result<()> {
        self.block = LocalBlock::new(vec![self.pos, self.neg, self.branch]);
        bind_branch(&mut self.block, matrix)
    }

    fn ac_stamp(&mut self, matrix: &mut SparseMatrix, _omega: f64) {
        self.stamp(matrix);
    }

    fn pz_stamp(&self, matrix: &mut SparseMatrix, _s: Complex<f64>) {
        self.stamp(matrix);
    }

    fn source(&self) -> Option<SourceInfo> {
        Some(SourceInfo {
            pos: self.pos,
            neg: self.neg,
            kind: SourceKind::Voltage {
                branch: self.branch,
            },
            ac: phasor(self.ac_magnitude, self.ac_phase),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Independent current source; current flows from `pos` through the source
/// into `neg`.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub name: String,
    pub pos: NodeId,
    pub neg: NodeId,
    /// DC value (A).
    pub dc: f64,
    pub ac_magnitude: f64,
    pub ac_phase: f64,
}

impl CurrentSource {
    pub fn new(name: impl Into<String>, pos: NodeId, neg: NodeId, dc: f64) -> Self {
        Self {
            name: name.into(),
            pos,
            neg,
            dc,
            ac_magnitude: 0.0,
            ac_phase: 0.0,
        }
    }

    pub fn with_ac(mut self, magnitude: f64, phase_deg: f64) -> Self {
        self.ac_magnitude = magnitude;
        self.ac_phase = phase_deg;
        self
    }
}

impl Device for CurrentSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, _matrix: &mut SparseMatrix) -> Result<()> {
        Ok(())
    }

    fn ac_stamp(&mut self, _matrix: &mut SparseMatrix, _omega: f64) {}

    fn pz_stamp(&self, _matrix: &mut SparseMatrix, _s: Complex<f64>) {}

    fn source(&self) -> Option<SourceInfo> {
        Some(SourceInfo {
            pos: self.pos,
            neg: self.neg,
            kind: SourceKind::Current,
            ac: phasor(self.ac_magnitude, self.ac_phase),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

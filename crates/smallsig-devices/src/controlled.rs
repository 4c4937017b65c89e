//! Linear controlled sources: VCCS (G) and VCVS (E).

use std::any::Any;

use num_complex::Complex;
use smallsig_core::{EquationTable, NodeId, SparseMatrix};

use crate::device::Device;
use crate::error::Result;
use crate::stamp::{LocalBlock, StampSet};

// ────────────────────── VCCS (G element) ──────────────────────

/// Voltage-controlled current source.
///
/// I(out+ → out-) = gm * V(ctrl+, ctrl-), flowing through the source.
#[derive(Debug, Clone)]
pub struct Vccs {
    pub name: String,
    pub out_pos: NodeId,
    pub out_neg: NodeId,
    pub ctrl_pos: NodeId,
    pub ctrl_neg: NodeId,
    pub gm: f64,
    block: LocalBlock,
}

impl Vccs {
    pub fn new(
        name: impl Into<String>,
        out_pos: NodeId,
        out_neg: NodeId,
        ctrl_pos: NodeId,
        ctrl_neg: NodeId,
        gm: f64,
    ) -> Self {
        Self {
            name: name.into(),
            out_pos,
            out_neg,
            ctrl_pos,
            ctrl_neg,
            gm,
            block: LocalBlock::default(),
        }
    }

    fn stamp(&self, matrix: &mut SparseMatrix) {
        let mut set = StampSet::with_capacity(4);
        set.transconductance(0, 1, 2, 3, Complex::new(self.gm, 0.0));
        set.apply(&self.block, matrix);
    }
}

impl Device for Vccs {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, matrix: &mut SparseMatrix) -> Result<()> {
        self.block = LocalBlock::new(vec![
            self.out_pos,
            self.out_neg,
            self.ctrl_pos,
            self.ctrl_neg,
        ]);
        for out in [0, 1] {
            self.block.bind_row(matrix, out, &[2, 3])?;
        }
        Ok(())
    }

    fn ac_stamp(&mut self, matrix: &mut SparseMatrix, _omega: f64) {
        self.stamp(matrix);
    }

    fn pz_stamp(&self, matrix: &mut SparseMatrix, _s: Complex<f64>) {
        self.stamp(matrix);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ────────────────────── VCVS (E element) ──────────────────────

/// Voltage-controlled voltage source.
///
/// V(out+, out-) = gain * V(ctrl+, ctrl-), with one branch-current unknown.
#[derive(Debug, Clone)]
pub struct Vcvs {
    pub name: String,
    pub out_pos: NodeId,
    pub out_neg: NodeId,
    pub ctrl_pos: NodeId,
    pub ctrl_neg: NodeId,
    pub gain: f64,
    branch: NodeId,
    block: LocalBlock,
}

impl Vcvs {
    pub fn new(
        name: impl Into<String>,
        out_pos: NodeId,
        out_neg: NodeId,
        ctrl_pos: NodeId,
        ctrl_neg: NodeId,
        gain: f64,
    ) -> Self {
        Self {
            name: name.into(),
            out_pos,
            out_neg,
            ctrl_pos,
            ctrl_neg,
            gain,
            branch: NodeId::GROUND,
            block: LocalBlock::default(),
        }
    }

    pub fn branch(&self) -> NodeId {
        self.branch
    }

    fn stamp(&self, matrix: &mut SparseMatrix) {
        const BR: usize = 4;
        let mut set = StampSet::with_capacity(6);
        // KCL at the outputs, then V(out+) - V(out-) - gain * V(ctrl) = 0.
        set.add_real(0, BR, 1.0);
        set.add_real(1, BR, -1.0);
        set.add_real(BR, 0, 1.0);
        set.add_real(BR, 1, -1.0);
        set.add_real(BR, 2, -self.gain);
        set.add_real(BR, 3, self.gain);
        set.apply(&self.block, matrix);
    }
}

impl Device for Vcvs {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare(&mut self, equations: &mut EquationTable) -> Result<()> {
        self.branch = equations.branch(&format!("{}#branch", self.name))?;
        Ok(())
    }

    fn setup(&mut self, matrix: &mut SparseMatrix) -> Result<()> {
        self.block = LocalBlock::new(vec![
            self.out_pos,
            self.out_neg,
            self.ctrl_pos,
            self.ctrl_neg,
            self.branch,
        ]);
        self.block.bind_column(matrix, &[0, 1], 4)?;
        self.block.bind_row(matrix, 4, &[0, 1, 2, 3])
    }

    fn ac_stamp(&mut self, matrix: &mut SparseMatrix, _omega: f64) {
        self.stamp(matrix);
    }

    fn pz_stamp(&self, matrix: &mut SparseMatrix, _s: Complex<f64>) {
        self.stamp(matrix);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//! Per-device adjoint shadow matrices.
//!
//! A shadow holds a private copy of one device's stamps, bound to the same
//! circuit nodes as the primary block but backed by its own matrix. The
//! device restamps it on every `ac_stamp`, so it is always cleared before
//! reuse and dropped with the device. Queries against it never touch the
//! primary matrix or solution.

use nalgebra::DVector;
use num_complex::Complex;
use num_traits::Zero;
use smallsig_core::{LinearSolver, NodeId, SparseMatrix};

use crate::error::Result;
use crate::stamp::{LocalBlock, StampSet};

#[derive(Debug)]
pub struct AdjointShadow {
    matrix: SparseMatrix,
    block: LocalBlock,
    stamped: bool,
}

impl AdjointShadow {
    /// Allocate a shadow with the same port pairs as `primary`, sized like
    /// the primary matrix. It reads as all zeros until the first restamp.
    pub fn allocate(primary: &LocalBlock, size: usize) -> Result<Self> {
        let mut matrix = SparseMatrix::new(size);
        let block = primary.rebind(&mut matrix)?;
        matrix.finalize();
        matrix.clear();
        matrix.freeze();
        Ok(Self {
            matrix,
            block,
            stamped: false,
        })
    }

    /// Clear the shadow and apply `set` to it.
    pub fn restamp(&mut self, set: &StampSet) {
        self.matrix.clear();
        set.apply(&self.block, &mut self.matrix);
        self.matrix.freeze();
        self.stamped = true;
    }

    /// True once the shadow has been stamped at least once.
    pub fn is_stamped(&self) -> bool {
        self.stamped
    }

    /// The shadow matrix, always frozen between restamps.
    pub fn matrix(&self) -> &SparseMatrix {
        &self.matrix
    }

    /// Currents flowing into the device at each distinct non-ground node for
    /// the given circuit node voltages.
    pub fn terminal_currents(
        &self,
        voltages: &DVector<Complex<f64>>,
    ) -> Result<Vec<(NodeId, Complex<f64>)>> {
        let y = self.matrix.mul_vec(voltages)?;
        Ok(self
            .local_nodes()
            .into_iter()
            .map(|node| (node, node.index().map(|i| y[i]).unwrap_or_else(Complex::zero)))
            .collect())
    }

    /// Solve the device's local admittance system for injected currents.
    ///
    /// Only the device's own nodes take part; every other circuit node is
    /// treated as grounded. Excitations at nodes the device does not touch
    /// are ignored.
    pub fn solve(
        &self,
        excitation: &[(NodeId, Complex<f64>)],
        solver: &dyn LinearSolver,
    ) -> Result<Vec<(NodeId, Complex<f64>)>> {
        let nodes = self.local_nodes();
        let local = |node: NodeId| nodes.iter().position(|&n| n == node);

        let mut compact = SparseMatrix::new(nodes.len());
        let mut entries = Vec::new();
        for (r, c, v) in self.matrix.entries() {
            let (row, col) = (NodeId::from_index(r), NodeId::from_index(c));
            if let (Some(lr), Some(lc)) = (local(row), local(col)) {
                let handle = compact.bind(NodeId::from_index(lr), NodeId::from_index(lc))?;
                entries.push((handle, v));
            }
        }
        compact.finalize();
        compact.clear();
        for (handle, v) in entries {
            compact.add_complex(handle, v);
        }
        compact.freeze();

        let mut rhs = DVector::from_element(nodes.len(), Complex::zero());
        for &(node, value) in excitation {
            if let Some(i) = local(node) {
                rhs[i] += value;
            }
        }
        let x = solver.solve_complex(&compact, &rhs)?;
        Ok(nodes.into_iter().zip(x.iter().copied()).collect())
    }

    fn local_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .block
            .nodes()
            .iter()
            .copied()
            .filter(|n| !n.is_ground())
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }
}

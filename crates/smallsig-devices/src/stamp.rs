//! Port-indexed handle blocks and ordered stamp sets.
//!
//! A device describes its terminals as a list of *ports*. During setup it
//! binds every `(row_port, col_port)` pair it will ever write into a
//! [`LocalBlock`]; at load time it builds a [`StampSet`] in port coordinates
//! and applies it through the block. The same stamp set can be applied to a
//! second block bound against a different matrix (the adjoint shadow).

use num_complex::Complex;
use smallsig_core::{MatrixHandle, NodeId, SparseMatrix};

use crate::error::Result;

/// Ordered `(row_port, col_port, value)` contributions from one stamp call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StampSet {
    entries: Vec<(usize, usize, Complex<f64>)>,
}

impl StampSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Add a complex value at a port pair.
    pub fn add(&mut self, row: usize, col: usize, value: Complex<f64>) {
        self.entries.push((row, col, value));
    }

    /// Add a real value at a port pair.
    pub fn add_real(&mut self, row: usize, col: usize, value: f64) {
        self.add(row, col, Complex::new(value, 0.0));
    }

    /// Two-terminal admittance `y` between ports `a` and `b`.
    pub fn admittance(&mut self, a: usize, b: usize, y: Complex<f64>) {
        self.add(a, a, y);
        self.add(a, b, -y);
        self.add(b, a, -y);
        self.add(b, b, y);
    }

    /// Real conductance between two ports.
    pub fn conductance(&mut self, a: usize, b: usize, g: f64) {
        self.admittance(a, b, Complex::new(g, 0.0));
    }

    /// Current `g * V(ctrl_pos, ctrl_neg)` flowing out of `out_pos` into `out_neg`.
    pub fn transconductance(
        &mut self,
        out_pos: usize,
        out_neg: usize,
        ctrl_pos: usize,
        ctrl_neg: usize,
        g: Complex<f64>,
    ) {
        self.add(out_pos, ctrl_pos, g);
        self.add(out_pos, ctrl_neg, -g);
        self.add(out_neg, ctrl_pos, -g);
        self.add(out_neg, ctrl_neg, g);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, usize, Complex<f64>)> {
        self.entries.iter()
    }

    /// Sum the contributions into a dense port-by-port matrix.
    ///
    /// Ports that alias the same circuit node stay separate here; this is the
    /// device's view before node merging.
    pub fn to_port_matrix(&self, ports: usize) -> Vec<Vec<Complex<f64>>> {
        let mut dense = vec![vec![Complex::new(0.0, 0.0); ports]; ports];
        for &(r, c, v) in &self.entries {
            dense[r][c] += v;
        }
        dense
    }

    /// Accumulate every contribution into `matrix` through `block`.
    pub fn apply(&self, block: &LocalBlock, matrix: &mut SparseMatrix) {
        for &(r, c, v) in &self.entries {
            matrix.add_complex(block.handle(r, c), v);
        }
    }
}

/// Matrix handles of one device, indexed by port pair.
///
/// Several ports may name the same circuit node (an internal node collapsed
/// onto its terminal when the series element is absent); the matrix dedups
/// the location, so both port pairs end up with the same handle.
#[derive(Debug, Clone, Default)]
pub struct LocalBlock {
    ports: Vec<NodeId>,
    handles: Vec<Option<MatrixHandle>>,
}

impl LocalBlock {
    /// Empty block over the given port-to-node map.
    pub fn new(ports: Vec<NodeId>) -> Self {
        let n = ports.len();
        Self {
            ports,
            handles: vec![None; n * n],
        }
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// Circuit node behind a port.
    pub fn node(&self, port: usize) -> NodeId {
        self.ports[port]
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.ports
    }

    /// Bind one port pair.
    pub fn bind(&mut self, matrix: &mut SparseMatrix, row: usize, col: usize) -> Result<()> {
        let handle = matrix.bind(self.ports[row], self.ports[col])?;
        let n = self.ports.len();
        self.handles[row * n + col] = Some(handle);
        Ok(())
    }

    /// Bind the four pairs of a two-terminal admittance.
    pub fn bind_admittance(&mut self, matrix: &mut SparseMatrix, a: usize, b: usize) -> Result<()> {
        for (r, c) in [(a, a), (a, b), (b, a), (b, b)] {
            self.bind(matrix, r, c)?;
        }
        Ok(())
    }

    /// Bind every pair within a set of ports.
    pub fn bind_dense(&mut self, matrix: &mut SparseMatrix, ports: &[usize]) -> Result<()> {
        for &r in ports {
            for &c in ports {
                self.bind(matrix, r, c)?;
            }
        }
        Ok(())
    }

    /// Bind `(row, c)` for every `c` in `cols`.
    pub fn bind_row(&mut self, matrix: &mut SparseMatrix, row: usize, cols: &[usize]) -> Result<()> {
        for &c in cols {
            self.bind(matrix, row, c)?;
        }
        Ok(())
    }

    /// Bind `(r, col)` for every `r` in `rows`.
    pub fn bind_column(
        &mut self,
        matrix: &mut SparseMatrix,
        rows: &[usize],
        col: usize,
    ) -> Result<()> {
        for &r in rows {
            self.bind(matrix, r, col)?;
        }
        Ok(())
    }

    /// Port pairs bound so far, row-major.
    pub fn bound_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.ports.len();
        self.handles
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_some())
            .map(move |(i, _)| (i / n, i % n))
    }

    /// Re-bind the same port pairs against another matrix.
    pub fn rebind(&self, matrix: &mut SparseMatrix) -> Result<LocalBlock> {
        let mut block = LocalBlock::new(self.ports.clone());
        for (r, c) in self.bound_pairs() {
            block.bind(matrix, r, c)?;
        }
        Ok(block)
    }

    /// Handle of a bound pair.
    ///
    /// # Panics
    ///
    /// Panics if the pair was never bound; stamping a location that setup did
    /// not reserve is a device bug.
    pub fn handle(&self, row: usize, col: usize) -> MatrixHandle {
        let n = self.ports.len();
        match self.handles.get(row * n + col).copied().flatten() {
            Some(handle) => handle,
            None => panic!("port pair ({row}, {col}) stamped but not bound during setup"),
        }
    }
}

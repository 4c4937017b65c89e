//! Sparse admittance matrix with setup-time handle binding.
//!
//! Devices call [`SparseMatrix::bind`] once per `(row, col)` location while the
//! matrix is in its setup phase and keep the returned [`MatrixHandle`]s. All
//! later stamping goes through those handles, which index straight into an
//! arena of complex values; no structural lookup happens in the load loop.
//!
//! # Lifecycle
//!
//! ```text
//! Setup --finalize--> Idle --clear--> Loading --freeze--> Frozen
//!   ^                                    ^                  |
//!   |                                    +------clear-------+
//!   +------------------------teardown----------------------+
//! ```
//!
//! - `bind` is only accepted during `Setup`; afterwards it returns
//!   [`Error::LateBind`].
//! - Stamping is only accepted during `Loading`, so every load pass starts
//!   from a cleared matrix.
//! - Solvers only read a `Frozen` matrix, so a half-stamped system is never
//!   factored.
//! - `teardown` bumps the handle generation; stamping through a handle from
//!   an earlier generation panics.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use num_traits::Zero;

use crate::error::{Error, Result};
use crate::node::NodeId;

static NEXT_MATRIX_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to one structurally nonzero matrix entry.
///
/// A handle addresses the complex value of the entry, so it covers both the
/// real part and its imaginary sibling. Handles that touch ground discard
/// whatever is stamped through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixHandle {
    slot: Option<u32>,
    matrix: u64,
    generation: u32,
}

impl MatrixHandle {
    /// Handle for a location in the ground row or column.
    pub const GROUND: MatrixHandle = MatrixHandle {
        slot: None,
        matrix: 0,
        generation: 0,
    };

    /// True if stamps through this handle are discarded.
    pub fn is_ground(&self) -> bool {
        self.slot.is_none()
    }
}

/// Where the matrix is in its setup/load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Structure is still growing; `bind` is allowed.
    Setup,
    /// Structure is final; waiting for the first `clear`.
    Idle,
    /// Cleared and accepting stamps.
    Loading,
    /// Fully stamped and readable by a solver.
    Frozen,
}

/// Complex sparse matrix backed by a value arena.
#[derive(Debug)]
pub struct SparseMatrix {
    id: u64,
    size: usize,
    generation: u32,
    phase: LoadPhase,
    structure: IndexSet<(usize, usize)>,
    values: Vec<Complex<f64>>,
}

impl SparseMatrix {
    /// Create an empty matrix of dimension `size` in the setup phase.
    pub fn new(size: usize) -> Self {
        Self {
            id: NEXT_MATRIX_ID.fetch_add(1, Ordering::Relaxed),
            size,
            generation: 0,
            phase: LoadPhase::Setup,
            structure: IndexSet::new(),
            values: Vec::new(),
        }
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of structurally nonzero entries.
    pub fn nnz(&self) -> usize {
        self.structure.len()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Resolve a stable handle for `(row, col)`, growing the structure if needed.
    ///
    /// Binding the same location twice returns the same handle. Locations in
    /// the ground row or column yield [`MatrixHandle::GROUND`].
    pub fn bind(&mut self, row: NodeId, col: NodeId) -> Result<MatrixHandle> {
        if self.phase != LoadPhase::Setup {
            return Err(Error::LateBind { row, col });
        }
        let (Some(r), Some(c)) = (row.index(), col.index()) else {
            return Ok(MatrixHandle::GROUND);
        };
        if r >= self.size || c >= self.size {
            return Err(Error::Allocation {
                row,
                col,
                reason: format!("outside {}x{} matrix", self.size, self.size),
            });
        }

        let (slot, inserted) = self.structure.insert_full((r, c));
        if inserted {
            self.values.push(Complex::zero());
        }
        let slot = u32::try_from(slot).map_err(|_| Error::Allocation {
            row,
            col,
            reason: "entry arena exhausted".to_string(),
        })?;

        Ok(MatrixHandle {
            slot: Some(slot),
            matrix: self.id,
            generation: self.generation,
        })
    }

    /// End the setup phase. Later `bind` calls fail with [`Error::LateBind`].
    pub fn finalize(&mut self) {
        assert_eq!(
            self.phase,
            LoadPhase::Setup,
            "matrix finalized twice without teardown"
        );
        self.phase = LoadPhase::Idle;
    }

    /// Drop the structure and invalidate every handle bound so far.
    pub fn teardown(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.structure.clear();
        self.values.clear();
        self.phase = LoadPhase::Setup;
    }

    /// Zero every entry and start a load pass.
    pub fn clear(&mut self) {
        assert!(
            self.phase != LoadPhase::Setup,
            "matrix cleared before setup finished"
        );
        self.values.fill(Complex::zero());
        self.phase = LoadPhase::Loading;
    }

    /// End the load pass and make the matrix readable by a solver.
    pub fn freeze(&mut self) {
        assert_eq!(
            self.phase,
            LoadPhase::Loading,
            "matrix frozen without a preceding clear"
        );
        self.phase = LoadPhase::Frozen;
    }

    /// Add to the real part of an entry.
    pub fn add(&mut self, handle: MatrixHandle, value: f64) {
        if let Some(entry) = self.entry_mut(handle) {
            entry.re += value;
        }
    }

    /// Add to the imaginary part of an entry.
    pub fn add_imag(&mut self, handle: MatrixHandle, value: f64) {
        if let Some(entry) = self.entry_mut(handle) {
            entry.im += value;
        }
    }

    /// Add a complex value to an entry.
    pub fn add_complex(&mut self, handle: MatrixHandle, value: Complex<f64>) {
        if let Some(entry) = self.entry_mut(handle) {
            *entry += value;
        }
    }

    fn entry_mut(&mut self, handle: MatrixHandle) -> Option<&mut Complex<f64>> {
        assert_eq!(
            self.phase,
            LoadPhase::Loading,
            "stamp outside a load pass (matrix not cleared)"
        );
        let slot = handle.slot?;
        assert_eq!(
            handle.matrix, self.id,
            "matrix handle used with a matrix it was not bound to"
        );
        assert_eq!(
            handle.generation, self.generation,
            "stale matrix handle used after teardown"
        );
        self.values.get_mut(slot as usize)
    }

    /// Value behind a handle; ground handles read as zero.
    pub fn value(&self, handle: MatrixHandle) -> Complex<f64> {
        match handle.slot {
            Some(slot) if handle.generation == self.generation && handle.matrix == self.id => {
                self.values.get(slot as usize).copied().unwrap_or_else(Complex::zero)
            }
            _ => Complex::zero(),
        }
    }

    /// Value at a location, `None` if the location is structurally zero.
    pub fn get(&self, row: usize, col: usize) -> Option<Complex<f64>> {
        self.structure
            .get_index_of(&(row, col))
            .and_then(|slot| self.values.get(slot).copied())
    }

    /// Iterate `(row, col, value)` over every structural entry of a frozen matrix.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, Complex<f64>)> + '_ {
        self.assert_frozen();
        self.structure
            .iter()
            .zip(self.values.iter())
            .map(|(&(r, c), &v)| (r, c, v))
    }

    /// Dense copy of the real parts.
    pub fn to_dense_real(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.size, self.size);
        for (r, c, v) in self.entries() {
            dense[(r, c)] += v.re;
        }
        dense
    }

    /// Dense complex copy.
    pub fn to_dense_complex(&self) -> DMatrix<Complex<f64>> {
        let mut dense = DMatrix::from_element(self.size, self.size, Complex::zero());
        for (r, c, v) in self.entries() {
            dense[(r, c)] += v;
        }
        dense
    }

    /// `y = A x` over the frozen matrix.
    pub fn mul_vec(&self, x: &DVector<Complex<f64>>) -> Result<DVector<Complex<f64>>> {
        if x.len() != self.size {
            return Err(Error::DimensionMismatch {
                expected: self.size,
                actual: x.len(),
            });
        }
        let mut y = DVector::from_element(self.size, Complex::zero());
        for (r, c, v) in self.entries() {
            y[r] += v * x[c];
        }
        Ok(y)
    }

    fn assert_frozen(&self) {
        assert_eq!(
            self.phase,
            LoadPhase::Frozen,
            "matrix read before its load pass completed"
        );
    }
}

//! Linear-solver service interface.
//!
//! Analyses hand a frozen [`SparseMatrix`] and a right-hand side to a
//! [`LinearSolver`] and get the solution back. Factorization strategy is the
//! implementor's business; smallsig-solver ships a dense/sparse LU one.

use nalgebra::DVector;
use num_complex::Complex;

use crate::error::Result;
use crate::matrix::SparseMatrix;

/// Opaque real/complex sparse solve.
///
/// Implementations fail with [`crate::Error::SingularMatrix`] when the matrix
/// is structurally or numerically singular.
pub trait LinearSolver: Send + Sync {
    /// Solve `Re(A) x = b`.
    fn solve_real(&self, matrix: &SparseMatrix, rhs: &DVector<f64>) -> Result<DVector<f64>>;

    /// Solve `A x = b` over the complex values.
    fn solve_complex(
        &self,
        matrix: &SparseMatrix,
        rhs: &DVector<Complex<f64>>,
    ) -> Result<DVector<Complex<f64>>>;

    /// Solve `A^T x = b`, the adjoint system used for noise transfer functions.
    fn solve_complex_transposed(
        &self,
        matrix: &SparseMatrix,
        rhs: &DVector<Complex<f64>>,
    ) -> Result<DVector<Complex<f64>>>;
}

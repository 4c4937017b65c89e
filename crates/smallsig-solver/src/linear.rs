//! Linear system solvers.
//!
//! Free functions solve dense (nalgebra LU) and triplet-form sparse (faer LU)
//! systems. [`SparseLu`] wraps them behind the [`LinearSolver`] service used
//! by every analysis, picking a path by system size.

use faer::prelude::*;
use faer::sparse::{SparseColMat, Triplet};
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use smallsig_core::{Error, LinearSolver, Result, SparseMatrix};

/// Systems with this many or more variables use the sparse solver path.
pub const SPARSE_THRESHOLD: usize = 50;

fn check_dimensions(rows: usize, cols: usize, rhs: usize) -> Result<()> {
    if rows != cols {
        return Err(Error::DimensionMismatch {
            expected: rows,
            actual: cols,
        });
    }
    if rows != rhs {
        return Err(Error::DimensionMismatch {
            expected: rows,
            actual: rhs,
        });
    }
    Ok(())
}

/// Solve a linear system Ax = b using LU decomposition.
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    check_dimensions(a.nrows(), a.ncols(), b.len())?;
    a.clone().lu().solve(b).ok_or(Error::SingularMatrix)
}

/// Solve a complex linear system Ax = b using LU decomposition.
pub fn solve_complex(
    a: &DMatrix<Complex<f64>>,
    b: &DVector<Complex<f64>>,
) -> Result<DVector<Complex<f64>>> {
    check_dimensions(a.nrows(), a.ncols(), b.len())?;
    a.clone().lu().solve(b).ok_or(Error::SingularMatrix)
}

/// Solve a sparse linear system Ax = b using sparse LU decomposition.
///
/// The matrix is constructed from triplets `(row, col, value)`. Duplicate entries
/// at the same position are summed automatically by faer.
pub fn solve_sparse(
    size: usize,
    triplets: &[(usize, usize, f64)],
    rhs: &DVector<f64>,
) -> Result<DVector<f64>> {
    check_dimensions(size, size, rhs.len())?;

    let faer_triplets: Vec<_> = triplets
        .iter()
        .map(|&(r, c, v)| Triplet::new(r, c, v))
        .collect();

    let sparse_mat = SparseColMat::<usize, f64>::try_new_from_triplets(size, size, &faer_triplets)
        .map_err(|_| Error::SingularMatrix)?;

    let lu = sparse_mat.sp_lu().map_err(|_| Error::SingularMatrix)?;
    let faer_rhs = Col::<f64>::from_fn(size, |i| rhs[i]);
    let faer_x = lu.solve(&faer_rhs);

    Ok(DVector::from_fn(size, |i, _| faer_x[i]))
}

/// Solve a sparse complex linear system Ax = b using sparse LU decomposition.
pub fn solve_sparse_complex(
    size: usize,
    triplets: &[(usize, usize, Complex<f64>)],
    rhs: &DVector<Complex<f64>>,
) -> Result<DVector<Complex<f64>>> {
    check_dimensions(size, size, rhs.len())?;

    let faer_triplets: Vec<_> = triplets
        .iter()
        .map(|&(r, c, v)| Triplet::new(r, c, c64::new(v.re, v.im)))
        .collect();

    let sparse_mat = SparseColMat::<usize, c64>::try_new_from_triplets(size, size, &faer_triplets)
        .map_err(|_| Error::SingularMatrix)?;

    let lu = sparse_mat.sp_lu().map_err(|_| Error::SingularMatrix)?;
    let faer_rhs = Col::<c64>::from_fn(size, |i| c64::new(rhs[i].re, rhs[i].im));
    let faer_x = lu.solve(&faer_rhs);

    Ok(DVector::from_fn(size, |i, _| {
        Complex::new(faer_x[i].re, faer_x[i].im)
    }))
}

/// Size-dispatched LU over a frozen [`SparseMatrix`].
///
/// Below `threshold` unknowns the matrix is densified and factored with
/// nalgebra; at or above it the structural entries go to faer's sparse LU.
/// A factorization that completes but yields non-finite values is reported
/// as [`Error::SingularMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseLu {
    pub threshold: usize,
}

impl Default for SparseLu {
    fn default() -> Self {
        Self {
            threshold: SPARSE_THRESHOLD,
        }
    }
}

impl SparseLu {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// Whether a system of `size` unknowns takes the sparse path.
    pub fn uses_sparse(&self, size: usize) -> bool {
        size >= self.threshold
    }

    fn complex(
        &self,
        matrix: &SparseMatrix,
        rhs: &DVector<Complex<f64>>,
        transposed: bool,
    ) -> Result<DVector<Complex<f64>>> {
        let size = matrix.size();
        let x = if self.uses_sparse(size) {
            debug!("sparse complex LU, {} unknowns, {} entries", size, matrix.nnz());
            let triplets: Vec<_> = matrix
                .entries()
                .map(|(r, c, v)| if transposed { (c, r, v) } else { (r, c, v) })
                .collect();
            solve_sparse_complex(size, &triplets, rhs)?
        } else {
            let dense = matrix.to_dense_complex();
            if transposed {
                solve_complex(&dense.transpose(), rhs)?
            } else {
                solve_complex(&dense, rhs)?
            }
        };
        if x.iter().all(|v| v.is_finite()) {
            Ok(x)
        } else {
            warn!("complex solve produced non-finite values, treating matrix as singular");
            Err(Error::SingularMatrix)
        }
    }
}

impl LinearSolver for SparseLu {
    fn solve_real(&self, matrix: &SparseMatrix, rhs: &DVector<f64>) -> Result<DVector<f64>> {
        let size = matrix.size();
        let x = if self.uses_sparse(size) {
            debug!("sparse real LU, {} unknowns, {} entries", size, matrix.nnz());
            let triplets: Vec<_> = matrix.entries().map(|(r, c, v)| (r, c, v.re)).collect();
            solve_sparse(size, &triplets, rhs)?
        } else {
            solve_dense(&matrix.to_dense_real(), rhs)?
        };
        if x.iter().all(|v| v.is_finite()) {
            Ok(x)
        } else {
            warn!("real solve produced non-finite values, treating matrix as singular");
            Err(Error::SingularMatrix)
        }
    }

    fn solve_complex(
        &self,
        matrix: &SparseMatrix,
        rhs: &DVector<Complex<f64>>,
    ) -> Result<DVector<Complex<f64>>> {
        self.complex(matrix, rhs, false)
    }

    fn solve_complex_transposed(
        &self,
        matrix: &SparseMatrix,
        rhs: &DVector<Complex<f64>>,
    ) -> Result<DVector<Complex<f64>>> {
        self.complex(matrix, rhs, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};
    use smallsig_core::NodeId;

    fn frozen(size: usize, entries: &[(usize, usize, Complex<f64>)]) -> SparseMatrix {
        let mut m = SparseMatrix::new(size);
        let handles: Vec<_> = entries
            .iter()
            .map(|&(r, c, _)| m.bind(NodeId::from_index(r), NodeId::from_index(c)).unwrap())
            .collect();
        m.finalize();
        m.clear();
        for (h, &(_, _, v)) in handles.into_iter().zip(entries) {
            m.add_complex(h, v);
        }
        m.freeze();
        m
    }

    #[test]
    fn test_solve_simple() {
        // 2x + y = 5
        // x + 3y = 6
        // Solution: x = 1.8, y = 1.4
        let a = dmatrix![2.0, 1.0; 1.0, 3.0];
        let b = dvector![5.0, 6.0];

        let x = solve_dense(&a, &b).unwrap();

        assert!((x[0] - 1.8).abs() < 1e-10);
        assert!((x[1] - 1.4).abs() < 1e-10);
    }

    #[test]
    fn test_singular_matrix() {
        let a = dmatrix![1.0, 2.0; 2.0, 4.0];
        let b = dvector![1.0, 2.0];

        let result = solve_dense(&a, &b);
        assert!(matches!(result, Err(Error::SingularMatrix)));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = dmatrix![1.0, 2.0; 3.0, 4.0];
        let b = dvector![1.0, 2.0, 3.0];

        let result = solve_dense(&a, &b);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_solve_sparse_simple() {
        let triplets = vec![(0, 0, 2.0), (0, 1, 1.0), (1, 0, 1.0), (1, 1, 3.0)];
        let b = dvector![5.0, 6.0];

        let x = solve_sparse(2, &triplets, &b).unwrap();

        assert!((x[0] - 1.8).abs() < 1e-10, "x[0] = {} (expected 1.8)", x[0]);
        assert!((x[1] - 1.4).abs() < 1e-10, "x[1] = {} (expected 1.4)", x[1]);
    }

    #[test]
    fn test_solve_sparse_with_duplicate_triplets() {
        let triplets = vec![
            (0, 0, 2.0),
            (0, 0, 1.0),
            (0, 1, 1.0),
            (1, 0, 1.0),
            (1, 1, 3.0),
        ];
        let b = dvector![4.0, 4.0];

        let x = solve_sparse(2, &triplets, &b).unwrap();

        assert!((x[0] - 1.0).abs() < 1e-10, "x[0] = {} (expected 1.0)", x[0]);
        assert!((x[1] - 1.0).abs() < 1e-10, "x[1] = {} (expected 1.0)", x[1]);
    }

    #[test]
    fn test_sparse_lu_paths_agree() {
        // (2+i)x + y = 5+i
        // x + (3-i)y = 6
        let entries = [
            (0, 0, Complex::new(2.0, 1.0)),
            (0, 1, Complex::new(1.0, 0.0)),
            (1, 0, Complex::new(0.5, 0.0)),
            (1, 1, Complex::new(3.0, -1.0)),
        ];
        let m = frozen(2, &entries);
        let b = dvector![Complex::new(5.0, 1.0), Complex::new(6.0, 0.0)];

        let dense = SparseLu::new(usize::MAX).solve_complex(&m, &b).unwrap();
        let sparse = SparseLu::new(0).solve_complex(&m, &b).unwrap();
        for i in 0..2 {
            assert!(
                (dense[i] - sparse[i]).norm() < 1e-12,
                "mismatch at [{}]: dense={}, sparse={}",
                i,
                dense[i],
                sparse[i]
            );
        }
    }

    #[test]
    fn test_transposed_solve() {
        let entries = [
            (0, 0, Complex::new(2.0, 0.0)),
            (0, 1, Complex::new(1.0, 0.0)),
            (1, 1, Complex::new(4.0, 0.0)),
        ];
        let m = frozen(2, &entries);
        let b = dvector![Complex::new(2.0, 0.0), Complex::new(9.0, 0.0)];

        // A^T = [[2, 0], [1, 4]]  ->  x = [1, 2]
        for solver in [SparseLu::new(usize::MAX), SparseLu::new(0)] {
            let x = solver.solve_complex_transposed(&m, &b).unwrap();
            assert!((x[0] - Complex::new(1.0, 0.0)).norm() < 1e-12, "x[0] = {}", x[0]);
            assert!((x[1] - Complex::new(2.0, 0.0)).norm() < 1e-12, "x[1] = {}", x[1]);
        }
    }

    #[test]
    fn test_real_solve_uses_real_part() {
        let entries = [
            (0, 0, Complex::new(2.0, 5.0)),
            (1, 1, Complex::new(4.0, -3.0)),
        ];
        let m = frozen(2, &entries);
        let x = SparseLu::default()
            .solve_real(&m, &dvector![2.0, 2.0])
            .unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_structurally_singular_is_reported() {
        let entries = [(0, 0, Complex::new(1.0, 0.0))];
        let m = frozen(2, &entries);
        let b = dvector![1.0, 1.0];
        assert!(matches!(
            SparseLu::default().solve_real(&m, &b),
            Err(Error::SingularMatrix)
        ));
    }
}

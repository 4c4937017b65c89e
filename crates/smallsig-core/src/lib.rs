//! Core structures for smallsig.
//!
//! This crate provides the pieces every other smallsig crate builds on:
//! - [`node`]: equation numbering shared by circuit nodes and branch unknowns
//! - [`matrix`]: the sparse admittance matrix and its setup-time [`MatrixHandle`] binding
//! - [`constants`]: physical constants injected into noise evaluation
//! - [`solve`]: the linear-solver service interface

pub mod constants;
pub mod error;
pub mod matrix;
pub mod node;
pub mod solve;

pub use constants::PhysicalConstants;
pub use error::{Error, Result};
pub use matrix::{LoadPhase, MatrixHandle, SparseMatrix};
pub use node::{EquationKind, EquationTable, NodeId};
pub use solve::LinearSolver;

//! Sweep driver and small-signal analyses for smallsig.
//!
//! This crate provides:
//! - [`linear`]: dense (nalgebra) and sparse (faer) LU behind [`SparseLu`]
//! - [`sweep`]: the point-atomic, pausable [`SweepJob`] state machine
//! - [`ac`], [`noise`], [`transfer`]: analyses driven by the sweep
//! - [`convergence`], [`truncation`]: circuit-wide passes for an outer
//!   Newton/time-step driver
//! - [`options`]: tolerances, temperature and the output budget

pub mod ac;
pub mod convergence;
pub mod error;
pub mod linear;
pub mod noise;
pub mod options;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod sweep;
pub mod transfer;
pub mod truncation;

pub use ac::{AcAnalysis, AcResult, AcRow, AcSpec};
pub use convergence::{ConvergenceReport, check_convergence};
pub use error::{Error, Result};
pub use linear::{SPARSE_THRESHOLD, SparseLu};
pub use noise::{
    N_MINGAIN, N_MINLOG, NoiseAnalysis, NoiseIntegral, NoiseMode, NoiseResult, NoiseRow,
    NoiseSpec, NoiseSweepState,
};
pub use options::SimOptions;
#[cfg(feature = "parallel")]
pub use parallel::{CircuitFactory, run_cycles};
pub use sweep::{
    AnalysisSpec, FixedOperatingPoint, FrequencySweep, OperatingPointProvider, SweepAnalysis,
    SweepJob, SweepPoint, SweepStatus,
};
pub use transfer::{
    OPEN_IMPEDANCE, TransferAnalysis, TransferFunctionSpec, TransferMode, TransferOutput,
    TransferRow,
};
pub use truncation::{
    DividedDifferenceEstimator, IntegrationMethod, IntegrationOrder, truncation_step,
};

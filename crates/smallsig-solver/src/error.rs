//! Error types for smallsig-solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Devices(#[from] smallsig_devices::Error),

    #[error(transparent)]
    Core(#[from] smallsig_core::Error),

    #[error("estimated sweep output of {estimated} bytes exceeds the {budget} byte budget")]
    OutputBudgetExceeded { estimated: usize, budget: usize },

    #[error("operating point failed: {0}")]
    OperatingPoint(String),

    #[error("invalid sweep: {0}")]
    InvalidSweep(String),

    #[error("sweep already finished")]
    SweepFinished,

    #[error("sweep cancelled")]
    SweepCancelled,
}

impl Error {
    /// True when the underlying linear solve hit a singular matrix.
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            Error::Core(smallsig_core::Error::SingularMatrix)
                | Error::Devices(smallsig_devices::Error::Core(
                    smallsig_core::Error::SingularMatrix
                ))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for smallsig-devices.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("undefined node: {0}")]
    NodeUndefined(String),

    #[error("undefined source: {0}")]
    SourceUndefined(String),

    #[error("invalid parameter {parameter} on {device}: {reason}")]
    InvalidParameter {
        device: String,
        parameter: &'static str,
        reason: String,
    },

    #[error("circuit has not been set up")]
    NotSetUp,

    #[error(transparent)]
    Core(#[from] smallsig_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

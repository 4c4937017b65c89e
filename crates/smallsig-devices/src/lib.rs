//! Device models and small-signal stamps for smallsig.
//!
//! This crate provides:
//! - The linearization contract every device implements ([`Device`])
//! - Port-indexed handle blocks and ordered stamp sets ([`LocalBlock`], [`StampSet`])
//! - Forward/reverse recombination tables ([`OperatingMode`], [`ModeTable`])
//! - Per-device adjoint shadow matrices ([`AdjointShadow`])
//! - Noise generator records ([`NoiseGenerator`])
//! - Linear elements, sources and a four-terminal field-effect device
//! - The [`Circuit`] container that owns devices and the primary matrix

pub mod circuit;
pub mod controlled;
pub mod device;
pub mod error;
pub mod fet;
pub mod mode;
pub mod noise;
pub mod passive;
pub mod shadow;
pub mod sources;
pub mod stamp;

pub use circuit::Circuit;
pub use device::{
    ChargeHistory, ConvergenceContext, Device, SourceInfo, SourceKind, TruncationEstimator,
};
pub use error::{Error, Result};
pub use mode::{ModeTable, OperatingMode, Orientation};
pub use noise::{NoiseGenerator, NoiseKind};
pub use shadow::AdjointShadow;
pub use stamp::{LocalBlock, StampSet};

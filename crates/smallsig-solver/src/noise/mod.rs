//! Small-signal noise analysis.
//!
//! At each frequency the analysis solves the adjoint system once with a unit
//! excitation at the output pair, which yields the transfer from every
//! device noise generator to the output. Generator densities are scaled by
//! that transfer and summed:
//!
//! - **Shot**: `2 q |I|`
//! - **Thermal**: `4 k T G`
//! - **Gain-only**: density supplied by the device (e.g. flicker noise)
//!
//! The total is referred to the input through `|Vout / Vin|²`, floored at
//! [`N_MINGAIN`]. In integrated mode every density is integrated over the
//! sweep with a piecewise power-law fit (see [`integrate_segment`]).

mod analysis;
mod integrate;

pub use analysis::{
    NoiseAnalysis, NoiseIntegral, NoiseMode, NoisePoint, NoiseResult, NoiseRow, NoiseSpec,
    NoiseSweepState,
};
pub use integrate::{N_MINGAIN, N_MINLOG, NoiseIntegrator, integrate_segment};

//! Simulation options shared by every analysis.

use smallsig_core::PhysicalConstants;
use smallsig_core::constants::REFERENCE_TEMPERATURE;

use crate::linear::SPARSE_THRESHOLD;

/// Tolerances, temperature and resource limits.
///
/// Defaults follow the classic SPICE `.options` values.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOptions {
    /// Relative tolerance.
    pub reltol: f64,
    /// Absolute current tolerance (A).
    pub abstol: f64,
    /// Absolute voltage tolerance (V).
    pub vntol: f64,
    /// Absolute charge tolerance (C).
    pub chgtol: f64,
    /// Truncation error overestimation factor.
    pub trtol: f64,
    /// Circuit temperature (K).
    pub temperature: f64,
    /// Upper bound on the estimated size of a sweep's result rows.
    pub max_output_bytes: usize,
    /// Systems with this many unknowns or more use the sparse LU path.
    pub sparse_threshold: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            reltol: 1e-3,
            abstol: 1e-12,
            vntol: 1e-6,
            chgtol: 1e-14,
            trtol: 7.0,
            temperature: REFERENCE_TEMPERATURE,
            max_output_bytes: 256 * 1024 * 1024,
            sparse_threshold: SPARSE_THRESHOLD,
        }
    }
}

impl SimOptions {
    /// Set the relative tolerance.
    pub fn with_reltol(mut self, reltol: f64) -> Self {
        self.reltol = reltol;
        self
    }

    /// Set the absolute current tolerance.
    pub fn with_abstol(mut self, abstol: f64) -> Self {
        self.abstol = abstol;
        self
    }

    /// Set the absolute voltage tolerance.
    pub fn with_vntol(mut self, vntol: f64) -> Self {
        self.vntol = vntol;
        self
    }

    /// Set the absolute charge tolerance.
    pub fn with_chgtol(mut self, chgtol: f64) -> Self {
        self.chgtol = chgtol;
        self
    }

    /// Set the truncation error factor.
    pub fn with_trtol(mut self, trtol: f64) -> Self {
        self.trtol = trtol;
        self
    }

    /// Set the circuit temperature in kelvin.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the output budget in bytes.
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Set the dense/sparse crossover size.
    pub fn with_sparse_threshold(mut self, threshold: usize) -> Self {
        self.sparse_threshold = threshold;
        self
    }

    /// Physical constants at the configured temperature.
    pub fn constants(&self) -> PhysicalConstants {
        PhysicalConstants::default().with_temperature(self.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.reltol, 1e-3);
        assert_eq!(opts.trtol, 7.0);
        assert_eq!(opts.max_output_bytes, 268_435_456);
        assert_eq!(opts.sparse_threshold, SPARSE_THRESHOLD);
    }

    #[test]
    fn test_constants_follow_temperature() {
        let opts = SimOptions::default().with_temperature(400.0);
        assert_eq!(opts.constants().temperature, 400.0);
    }
}

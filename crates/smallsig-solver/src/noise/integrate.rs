//! Closed-form integration of sampled noise densities.
//!
//! Between two samples the density is taken to follow a power law
//! `a * f^k`, fitted through the natural logs of both samples, and
//! integrated exactly.

/// Floor applied to densities before taking their log.
pub const N_MINLOG: f64 = 1e-38;

/// Smallest output-to-input gain used for input referral.
pub const N_MINGAIN: f64 = 1e-20;

/// Exponents closer to zero than this are treated as zero.
const EXPONENT_EPS: f64 = 1e-10;

/// Integral of the power law through `(last_freq, last_density)` and
/// `(freq, density)` over `[last_freq, freq]`.
///
/// Frequencies must be positive and ascending. A zero-width segment
/// contributes nothing.
pub fn integrate_segment(last_freq: f64, last_density: f64, freq: f64, density: f64) -> f64 {
    let del_freq = freq - last_freq;
    if del_freq <= 0.0 {
        return 0.0;
    }
    let ln_freq = freq.ln();
    let ln_last_freq = last_freq.ln();
    let del_ln_freq = ln_freq - ln_last_freq;
    let ln_density = density.max(N_MINLOG).ln();
    let ln_last_density = last_density.max(N_MINLOG).ln();

    let exponent = (ln_density - ln_last_density) / del_ln_freq;
    if exponent.abs() < EXPONENT_EPS {
        return density * del_freq;
    }
    let a = (ln_density - exponent * ln_freq).exp();
    let exponent = exponent + 1.0;
    if exponent.abs() < EXPONENT_EPS {
        a * del_ln_freq
    } else {
        a * ((exponent * ln_freq).exp() - (exponent * ln_last_freq).exp()) / exponent
    }
}

/// Running integral of one density over an ascending sweep.
///
/// The first sample only seeds the history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoiseIntegrator {
    last: Option<(f64, f64)>,
    total: f64,
}

impl NoiseIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the density sampled at `frequency`.
    pub fn add(&mut self, frequency: f64, density: f64) {
        if let Some((last_freq, last_density)) = self.last {
            self.total += integrate_segment(last_freq, last_density, frequency, density);
        }
        self.last = Some((frequency, density));
    }

    /// Integral so far.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Frequency of the latest sample.
    pub fn last_frequency(&self) -> Option<f64> {
        self.last.map(|(f, _)| f)
    }
}

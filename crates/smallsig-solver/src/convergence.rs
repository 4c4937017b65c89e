//! Circuit-wide convergence pass over the latest Newton iterate.

use log::debug;
use nalgebra::DVector;
use smallsig_devices::{Circuit, ConvergenceContext};

use crate::options::SimOptions;

/// Outcome of one convergence pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConvergenceReport {
    /// Number of devices whose check failed.
    pub nonconverged: usize,
    /// Names of the failing devices, in circuit order.
    pub devices: Vec<String>,
}

impl ConvergenceReport {
    pub fn is_converged(&self) -> bool {
        self.nonconverged == 0
    }
}

/// Run every device's convergence check against `solution`.
///
/// Each device stops at its own first failing check; the pass itself
/// visits every device so the report names all of them. Retrying is the
/// caller's decision.
pub fn check_convergence(
    circuit: &Circuit,
    solution: &DVector<f64>,
    options: &SimOptions,
) -> ConvergenceReport {
    let mut ctx = ConvergenceContext::new(solution, options.reltol, options.abstol);
    let mut devices = Vec::new();
    for device in circuit.devices() {
        if !device.convergence_check(&mut ctx) {
            devices.push(device.name().to_string());
        }
    }
    let report = ConvergenceReport {
        nonconverged: ctx.nonconvergence_count(),
        devices,
    };
    if !report.is_converged() {
        debug!(
            "{} devices not converged: {}",
            report.nonconverged,
            report.devices.join(", ")
        );
    }
    report
}

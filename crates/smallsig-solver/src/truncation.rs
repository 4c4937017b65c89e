//! Divided-difference local truncation error estimator.

use smallsig_devices::{ChargeHistory, Circuit, TruncationEstimator};

use crate::options::SimOptions;

/// Integration formula used by the time-stepping driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationMethod {
    #[default]
    Trapezoidal,
    Gear,
}

/// Integration order. The charge history holds four points, enough for
/// second order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegrationOrder {
    #[default]
    First,
    Second,
}

impl IntegrationOrder {
    pub fn value(self) -> usize {
        match self {
            IntegrationOrder::First => 1,
            IntegrationOrder::Second => 2,
        }
    }
}

const TRAP_COEFF: [f64; 2] = [0.5, 0.083_333_333_33];
const GEAR_COEFF: [f64; 2] = [0.5, 0.222_222_222_2];

/// Step bound from the `order + 1`-th divided difference of a charge.
///
/// `deltas[0]` is the step just taken, `deltas[1]` the one before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DividedDifferenceEstimator {
    pub method: IntegrationMethod,
    pub order: IntegrationOrder,
    pub deltas: [f64; 3],
    pub reltol: f64,
    pub abstol: f64,
    pub chgtol: f64,
    pub trtol: f64,
}

impl DividedDifferenceEstimator {
    pub fn new(
        method: IntegrationMethod,
        order: IntegrationOrder,
        deltas: [f64; 3],
        options: &SimOptions,
    ) -> Self {
        Self {
            method,
            order,
            deltas,
            reltol: options.reltol,
            abstol: options.abstol,
            chgtol: options.chgtol,
            trtol: options.trtol,
        }
    }

    fn factor(&self) -> f64 {
        let i = self.order.value() - 1;
        match self.method {
            IntegrationMethod::Trapezoidal => TRAP_COEFF[i],
            IntegrationMethod::Gear => GEAR_COEFF[i],
        }
    }
}

impl TruncationEstimator for DividedDifferenceEstimator {
    fn max_step(&self, history: &ChargeHistory) -> f64 {
        let order = self.order.value();
        let q = &history.charge;
        let ccap = &history.current;

        let volttol = self.abstol + self.reltol * ccap[0].abs().max(ccap[1].abs());
        let chargetol =
            self.reltol * q[0].abs().max(q[1].abs()).max(self.chgtol) / self.deltas[0];
        let tol = volttol.max(chargetol);

        let mut diff = [0.0; 4];
        diff[..=order + 1].copy_from_slice(&q[..=order + 1]);
        let mut deltmp = [0.0; 3];
        deltmp[..=order].copy_from_slice(&self.deltas[..=order]);

        let mut j = order;
        loop {
            for i in 0..=j {
                diff[i] = (diff[i] - diff[i + 1]) / deltmp[i];
            }
            if j == 0 {
                break;
            }
            j -= 1;
            for i in 0..=j {
                deltmp[i] = deltmp[i + 1] + self.deltas[i];
            }
        }

        let del = self.trtol * tol / self.abstol.max(self.factor() * diff[0].abs());
        match self.order {
            IntegrationOrder::First => del,
            IntegrationOrder::Second => del.sqrt(),
        }
    }
}

/// Shrink `step` to what every device's charge histories allow.
pub fn truncation_step(circuit: &Circuit, estimator: &dyn TruncationEstimator, step: f64) -> f64 {
    circuit
        .devices()
        .fold(step, |bound, device| device.truncation_step(estimator, bound))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(q: [f64; 4]) -> ChargeHistory {
        ChargeHistory {
            charge: q,
            current: [0.0, 0.0],
        }
    }

    #[test]
    fn test_quadratic_charge_first_order() {
        // q(t) = t^2 sampled at t = 3, 2, 1 with unit steps.
        let est = DividedDifferenceEstimator::new(
            IntegrationMethod::Trapezoidal,
            IntegrationOrder::First,
            [1.0, 1.0, 1.0],
            &SimOptions::default(),
        );
        let del = est.max_step(&history([9.0, 4.0, 1.0, 0.0]));
        // tol = 1e-3 * 9 / 1, second divided difference = 1, factor 0.5.
        let expected = 7.0 * 9e-3 / 0.5;
        assert!((del - expected).abs() < 1e-12, "del = {}", del);
    }

    #[test]
    fn test_linear_charge_allows_large_step() {
        let est = DividedDifferenceEstimator::new(
            IntegrationMethod::Trapezoidal,
            IntegrationOrder::First,
            [1.0, 1.0, 1.0],
            &SimOptions::default(),
        );
        let del = est.max_step(&history([3.0, 2.0, 1.0, 0.0]));
        assert!(del > 1e6, "del = {}", del);
    }

    #[test]
    fn test_cubic_charge_second_order_gear() {
        // q(t) = t^3 at t = 4, 3, 2, 1: third divided difference is 1.
        let est = DividedDifferenceEstimator::new(
            IntegrationMethod::Gear,
            IntegrationOrder::Second,
            [1.0, 1.0, 1.0],
            &SimOptions::default(),
        );
        let del = est.max_step(&history([64.0, 27.0, 8.0, 1.0]));
        let expected = (7.0 * 64e-3 / 0.222_222_222_2f64).sqrt();
        assert!((del - expected).abs() < 1e-9, "del = {} expected {}", del, expected);
    }
}

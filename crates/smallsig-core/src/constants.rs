//! Physical constants used by noise evaluation.

/// Boltzmann constant (J/K).
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Elementary charge (C).
pub const CHARGE: f64 = 1.602176634e-19;

/// Nominal simulation temperature (K), 27 °C.
pub const REFERENCE_TEMPERATURE: f64 = 300.15;

/// Constants injected into noise evaluation instead of being read from globals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    /// Boltzmann constant (J/K).
    pub boltzmann: f64,
    /// Elementary charge (C).
    pub charge: f64,
    /// Circuit temperature (K).
    pub temperature: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            boltzmann: BOLTZMANN,
            charge: CHARGE,
            temperature: REFERENCE_TEMPERATURE,
        }
    }
}

impl PhysicalConstants {
    /// Set the circuit temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// `4kT`, the thermal noise prefactor.
    pub fn four_kt(&self) -> f64 {
        4.0 * self.boltzmann * self.temperature
    }

    /// `2q`, the shot noise prefactor.
    pub fn two_q(&self) -> f64 {
        2.0 * self.charge
    }

    /// Thermal voltage `kT/q`.
    pub fn thermal_voltage(&self) -> f64 {
        self.boltzmann * self.temperature / self.charge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thermal_voltage_at_reference() {
        let c = PhysicalConstants::default();
        assert!((c.thermal_voltage() - 0.025865).abs() < 1e-5);
    }

    #[test]
    fn test_synthetic_constants() {
        let c = PhysicalConstants {
            boltzmann: 1.0,
            charge: 0.5,
            temperature: 2.0,
        };
        assert_eq!(c.four_kt(), 8.0);
        assert_eq!(c.two_q(), 1.0);
    }
}

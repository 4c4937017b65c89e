//! Instance parameters of the four-terminal field-effect device.

use crate::error::{Error, Result};
use crate::fet::noise::GateNoiseTable;

/// Channel type. Terminal voltages are multiplied by [`Polarity::sign`]
/// before they are compared with the operating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    N,
    P,
}

impl Polarity {
    pub fn sign(self) -> f64 {
        match self {
            Polarity::N => 1.0,
            Polarity::P => -1.0,
        }
    }
}

/// Gate resistance network topology.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GateNetwork {
    /// Gate terminal connects straight to the intrinsic gate.
    #[default]
    None,
    /// Fixed electrode conductance between the gate and the intrinsic gate.
    Resistor { conductance: f64 },
    /// Electrode conductance in series with the bias-dependent gate-charge
    /// conductance, gate to intrinsic gate.
    TwoNode { electrode: f64 },
    /// Electrode conductance from the gate to a mid node, gate-charge
    /// conductance from the mid node to the intrinsic gate.
    ThreeNode { electrode: f64 },
}

impl GateNetwork {
    /// Electrode conductance, if the network has one.
    pub fn electrode(&self) -> Option<f64> {
        match *self {
            GateNetwork::None => None,
            GateNetwork::Resistor { conductance } => Some(conductance),
            GateNetwork::TwoNode { electrode } | GateNetwork::ThreeNode { electrode } => {
                Some(electrode)
            }
        }
    }
}

/// Flicker noise coefficients: density `kf * |id|^af / f^ef`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlickerNoise {
    pub kf: f64,
    pub af: f64,
    pub ef: f64,
}

impl Default for FlickerNoise {
    fn default() -> Self {
        Self {
            kf: 0.0,
            af: 1.0,
            ef: 1.0,
        }
    }
}

/// Instance configuration of a [`super::Fet`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetParams {
    pub polarity: Polarity,
    /// Drain series resistance (Ω). Zero collapses the internal drain node.
    pub drain_resistance: f64,
    /// Source series resistance (Ω). Zero collapses the internal source node.
    pub source_resistance: f64,
    pub gate_network: GateNetwork,
    /// Adds a thermal node stamped with `gth + s*cth`.
    pub self_heating: bool,
    /// Keep an adjoint shadow for terminal-current queries.
    pub adjoint: bool,
    pub flicker: FlickerNoise,
    pub gate_noise: GateNoiseTable,
}

impl FetParams {
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_drain_resistance(mut self, ohms: f64) -> Self {
        self.drain_resistance = ohms;
        self
    }

    pub fn with_source_resistance(mut self, ohms: f64) -> Self {
        self.source_resistance = ohms;
        self
    }

    pub fn with_gate_network(mut self, network: GateNetwork) -> Self {
        self.gate_network = network;
        self
    }

    pub fn with_self_heating(mut self, enabled: bool) -> Self {
        self.self_heating = enabled;
        self
    }

    pub fn with_adjoint(mut self, enabled: bool) -> Self {
        self.adjoint = enabled;
        self
    }

    pub fn with_flicker(mut self, flicker: FlickerNoise) -> Self {
        self.flicker = flicker;
        self
    }

    pub fn with_gate_noise(mut self, table: GateNoiseTable) -> Self {
        self.gate_noise = table;
        self
    }

    /// Reject negative or non-finite resistances and malformed noise tables.
    pub fn validate(&self, device: &str) -> Result<()> {
        let invalid = |parameter: &'static str, reason: String| Error::InvalidParameter {
            device: device.to_string(),
            parameter,
            reason,
        };

        for (parameter, value) in [
            ("rd", self.drain_resistance),
            ("rs", self.source_resistance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(parameter, format!("{value} is not a resistance")));
            }
        }
        if let Some(g) = self.gate_network.electrode() {
            if !g.is_finite() || g <= 0.0 {
                return Err(invalid("rg", format!("electrode conductance {g} must be positive")));
            }
        }
        let f = &self.flicker;
        if !(f.kf.is_finite() && f.af.is_finite() && f.ef.is_finite()) || f.kf < 0.0 {
            return Err(invalid("kf", "flicker coefficients must be finite".to_string()));
        }
        self.gate_noise.validate(device)
    }
}

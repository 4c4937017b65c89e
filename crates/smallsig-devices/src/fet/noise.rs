//! Noise generators of the field-effect device.
//!
//! Gate tunnelling shot noise is routed through a per-mode table: in each
//! mode the gate-source and gate-drain generators pick up a weighted share of
//! the channel gate currents. The table is data supplied with the device and
//! validated at setup; its forward and reverse entries need not mirror each
//! other.

use smallsig_core::NodeId;

use crate::error::{Error, Result};
use crate::fet::operating_point::FetOperatingPoint;
use crate::fet::params::{FetParams, GateNetwork};
use crate::fet::ports::{D, DP, G, GM, GP, PORTS, S, SP};
use crate::mode::{ModeTable, OperatingMode};
use crate::noise::NoiseGenerator;

/// Weights applied to `[igcs, igcd]` for each gate shot generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateNoiseRouting {
    pub gate_source: [f64; 2],
    pub gate_drain: [f64; 2],
}

/// Forward/reverse gate noise routing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateNoiseTable {
    pub routing: ModeTable<GateNoiseRouting>,
}

impl Default for GateNoiseTable {
    /// Channel gate current follows the canonical terminals: in reverse mode
    /// the physical source sees the canonical drain share.
    fn default() -> Self {
        Self {
            routing: ModeTable {
                forward: GateNoiseRouting {
                    gate_source: [1.0, 0.0],
                    gate_drain: [0.0, 1.0],
                },
                reverse: GateNoiseRouting {
                    gate_source: [0.0, 1.0],
                    gate_drain: [1.0, 0.0],
                },
            },
        }
    }
}

impl GateNoiseTable {
    pub fn select(&self, mode: OperatingMode) -> &GateNoiseRouting {
        self.routing.select(mode)
    }

    /// Every weight must lie in `[0, 1]`.
    pub fn validate(&self, device: &str) -> Result<()> {
        let rows = [&self.routing.forward, &self.routing.reverse];
        let ok = rows.iter().all(|r| {
            r.gate_source
                .iter()
                .chain(r.gate_drain.iter())
                .all(|w| w.is_finite() && (0.0..=1.0).contains(w))
        });
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidParameter {
                device: device.to_string(),
                parameter: "gate_noise",
                reason: "routing weights must lie in [0, 1]".to_string(),
            })
        }
    }
}

/// Noise generators for one frequency point.
pub(super) fn generators(
    name: &str,
    ports: &[NodeId; PORTS],
    params: &FetParams,
    op: &FetOperatingPoint,
    frequency: f64,
) -> Vec<NoiseGenerator> {
    let mode = op.mode();
    let orient = super::ORIENTATION.select(mode);
    let mut gens = Vec::with_capacity(7);

    if params.drain_resistance > 0.0 {
        gens.push(NoiseGenerator::thermal(
            format!("{name}.rd"),
            ports[D],
            ports[DP],
            1.0 / params.drain_resistance,
        ));
    }
    if params.source_resistance > 0.0 {
        gens.push(NoiseGenerator::thermal(
            format!("{name}.rs"),
            ports[S],
            ports[SP],
            1.0 / params.source_resistance,
        ));
    }
    if let Some(g) = params.gate_network.electrode() {
        let inner = match params.gate_network {
            GateNetwork::ThreeNode { .. } => GM,
            _ => GP,
        };
        gens.push(NoiseGenerator::thermal(
            format!("{name}.rg"),
            ports[G],
            ports[inner],
            g,
        ));
    }

    let (drain, source) = (ports[orient.drain], ports[orient.source]);
    gens.push(NoiseGenerator::thermal(
        format!("{name}.id"),
        drain,
        source,
        op.channel.noise_conductance(),
    ));

    let f = &params.flicker;
    let flicker = if frequency > 0.0 && f.kf > 0.0 {
        f.kf * op.bias.cd.abs().powf(f.af) / frequency.powf(f.ef)
    } else {
        0.0
    };
    gens.push(NoiseGenerator::gain_only(
        format!("{name}.1overf"),
        drain,
        source,
        flicker,
    ));

    let routing = params.gate_noise.select(mode);
    let ig = &op.gate_currents;
    let split = |w: [f64; 2]| w[0] * ig.igcs + w[1] * ig.igcd;
    gens.push(NoiseGenerator::shot(
        format!("{name}.igs"),
        ports[GP],
        ports[SP],
        ig.igs + split(routing.gate_source),
    ));
    gens.push(NoiseGenerator::shot(
        format!("{name}.igd"),
        ports[GP],
        ports[DP],
        ig.igd + split(routing.gate_drain),
    ));

    gens
}

//! Four-terminal field-effect device.
//!
//! The device physics is external: callers hand the device a
//! [`FetOperatingPoint`] after each evaluation and the device turns it into
//! stamps, convergence decisions, step proposals and noise generators.
//!
//! # Topology
//!
//! ```text
//!            G
//!            |
//!        [gate network]        (optional: R, two-node, three-node)
//!            |
//!   D --rd-- DP ==channel== SP --rs-- S
//!                    |
//!                    B                 T (thermal node, optional)
//! ```

pub mod noise;
pub mod operating_point;
pub mod params;
pub mod ports;
pub mod stamp;

use std::any::Any;

use num_complex::Complex;
use smallsig_core::{EquationTable, NodeId, SparseMatrix};

use crate::device::{ChargeHistory, ConvergenceContext, Device, TruncationEstimator};
use crate::error::Result;
use crate::mode::{ModeTable, OperatingMode, Orientation};
use crate::noise::NoiseGenerator;
use crate::shadow::AdjointShadow;
use crate::stamp::{LocalBlock, StampSet};

pub use noise::{GateNoiseRouting, GateNoiseTable};
pub use operating_point::{
    BiasPoint, ChannelConductances, FetOperatingPoint, GateChargeTerms, GateCurrents,
    IntrinsicCapacitances, JunctionTerms, OverlapCapacitances, ThermalTerms,
};
pub use params::{FetParams, FlickerNoise, GateNetwork, Polarity};
pub use stamp::StampVariant;

use ports::{B, D, DP, G, GM, GP, PORTS, S, SP, T};

/// Canonical drain/source per mode.
pub(crate) const ORIENTATION: ModeTable<Orientation> = Orientation::table(DP, SP);

/// Charge histories tracked for truncation control.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FetCharges {
    pub gate: ChargeHistory,
    pub drain: ChargeHistory,
    pub bulk: ChargeHistory,
    /// Only consulted when self-heating is enabled.
    pub thermal: ChargeHistory,
}

#[derive(Debug)]
pub struct Fet {
    name: String,
    ports: [NodeId; PORTS],
    params: FetParams,
    op: FetOperatingPoint,
    charges: FetCharges,
    block: LocalBlock,
    shadow: Option<AdjointShadow>,
}

impl Fet {
    pub fn new(
        name: impl Into<String>,
        drain: NodeId,
        gate: NodeId,
        source: NodeId,
        bulk: NodeId,
        params: FetParams,
    ) -> Self {
        let mut ports = [NodeId::GROUND; PORTS];
        ports[D] = drain;
        ports[G] = gate;
        ports[S] = source;
        ports[B] = bulk;
        ports[DP] = drain;
        ports[GP] = gate;
        ports[SP] = source;
        ports[GM] = gate;
        Self {
            name: name.into(),
            ports,
            params,
            op: FetOperatingPoint::default(),
            charges: FetCharges::default(),
            block: LocalBlock::default(),
            shadow: None,
        }
    }

    pub fn params(&self) -> &FetParams {
        &self.params
    }

    /// Circuit node behind a port role (see [`ports`]).
    pub fn node(&self, port: usize) -> NodeId {
        self.ports[port]
    }

    pub fn operating_point(&self) -> &FetOperatingPoint {
        &self.op
    }

    /// Install the operating point of the latest evaluation.
    pub fn set_operating_point(&mut self, op: FetOperatingPoint) {
        self.op = op;
    }

    pub fn mode(&self) -> OperatingMode {
        self.op.mode()
    }

    pub fn charges(&self) -> &FetCharges {
        &self.charges
    }

    pub fn charges_mut(&mut self) -> &mut FetCharges {
        &mut self.charges
    }

    /// Stamps in port coordinates at complex frequency `s`.
    pub fn stamp_set(&self, s: Complex<f64>, variant: StampVariant) -> StampSet {
        stamp::build(&self.params, &self.op, s, variant)
    }
}

impl Device for Fet {
    fn name(&self) -> &str {
        &self.name
    }

    fn declare(&mut self, equations: &mut EquationTable) -> Result<()> {
        self.params.validate(&self.name)?;
        let name = self.name.clone();
        let mut internal = |suffix: &str| equations.internal(&format!("{name}#{suffix}"));

        if self.params.drain_resistance > 0.0 {
            self.ports[DP] = internal("dp")?;
        }
        if self.params.source_resistance > 0.0 {
            self.ports[SP] = internal("sp")?;
        }
        match self.params.gate_network {
            GateNetwork::None => {}
            GateNetwork::ThreeNode { .. } => {
                self.ports[GP] = internal("gp")?;
                self.ports[GM] = internal("gm")?;
            }
            _ => self.ports[GP] = internal("gp")?,
        }
        if !matches!(self.params.gate_network, GateNetwork::ThreeNode { .. }) {
            self.ports[GM] = self.ports[GP];
        }
        if self.params.self_heating {
            self.ports[T] = internal("t")?;
        }
        Ok(())
    }

    fn setup(&mut self, matrix: &mut SparseMatrix) -> Result<()> {
        let mut block = LocalBlock::new(self.ports.to_vec());
        stamp::bind(&mut block, matrix, &self.params)?;
        self.shadow = if self.params.adjoint {
            Some(AdjointShadow::allocate(&block, matrix.size())?)
        } else {
            None
        };
        self.block = block;
        Ok(())
    }

    fn ac_stamp(&mut self, matrix: &mut SparseMatrix, omega: f64) {
        let set = self.stamp_set(Complex::new(0.0, omega), StampVariant::Full);
        set.apply(&self.block, matrix);
        if let Some(shadow) = self.shadow.as_mut() {
            shadow.restamp(&set);
        }
    }

    fn pz_stamp(&self, matrix: &mut SparseMatrix, s: Complex<f64>) {
        self.stamp_set(s, StampVariant::PoleZero)
            .apply(&self.block, matrix);
    }

    /// Predict the drain and bulk currents from the last conductances and
    /// compare with the present bias.
    fn convergence_check(&self, ctx: &mut ConvergenceContext<'_>) -> bool {
        let sign = self.params.polarity.sign();
        let v = |port: usize| ctx.value(self.ports[port]);
        let vbs = sign * (v(B) - v(SP));
        let vgs = sign * (v(GP) - v(SP));
        let vds = sign * (v(DP) - v(SP));
        let vbd = vbs - vds;
        let vgd = vgs - vds;

        let bias = &self.op.bias;
        let ch = &self.op.channel;
        let j = &self.op.junction;
        let delvbs = vbs - bias.vbs;
        let delvbd = vbd - (bias.vbs - bias.vds);
        let delvgs = vgs - bias.vgs;
        let delvds = vds - bias.vds;
        let delvgd = vgd - (bias.vgs - bias.vds);

        let cd = bias.cd - bias.cbd;
        let cdhat = match self.op.mode() {
            OperatingMode::Forward => {
                cd - j.gbd * delvbd + ch.gmbs * delvbs + ch.gm * delvgs + ch.gds * delvds
            }
            OperatingMode::Reverse => {
                cd - (j.gbd - ch.gmbs) * delvbd - ch.gm * delvgd + ch.gds * delvds
            }
        };
        if (cdhat - cd).abs() >= ctx.tolerance(cdhat, cd) {
            ctx.flag_nonconvergence();
            return false;
        }

        let cb = bias.cbs + bias.cbd;
        let cbhat = cb + j.gbd * delvbd + j.gbs * delvbs;
        if (cbhat - cb).abs() > ctx.tolerance(cbhat, cb) {
            ctx.flag_nonconvergence();
            return false;
        }
        true
    }

    fn truncation_step(&self, estimator: &dyn TruncationEstimator, step: f64) -> f64 {
        let c = &self.charges;
        let mut tracked = vec![&c.gate, &c.drain, &c.bulk];
        if self.params.self_heating {
            tracked.push(&c.thermal);
        }
        tracked
            .into_iter()
            .fold(step, |bound, history| bound.min(estimator.max_step(history)))
    }

    fn noise_generators(&self, frequency: f64) -> Vec<NoiseGenerator> {
        noise::generators(&self.name, &self.ports, &self.params, &self.op, frequency)
    }

    fn shadow(&self) -> Option<&AdjointShadow> {
        self.shadow.as_ref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//! Linearization snapshot of a field-effect device.
//!
//! Everything here is produced by the device physics for the current
//! iteration and only read by the stamping code. Channel, intrinsic
//! capacitance, thermal and gate-charge terms are in *canonical* orientation
//! (drain is whichever terminal the operating mode says it is); junction,
//! overlap and bias terms are physical.

use crate::mode::OperatingMode;

/// Canonical terminal indices used by [`IntrinsicCapacitances::matrix`] and
/// [`ThermalTerms::power`].
pub const GATE: usize = 0;
pub const DRAIN: usize = 1;
pub const SOURCE: usize = 2;
pub const BULK: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelConductances {
    pub gm: f64,
    pub gds: f64,
    pub gmbs: f64,
}

impl ChannelConductances {
    /// Conductance used for channel thermal noise.
    pub fn noise_conductance(&self) -> f64 {
        2.0 / 3.0 * (self.gm + self.gds + self.gmbs).abs()
    }
}

/// Intrinsic charge derivatives `dQ_row / dV_col` for the gate, bulk and
/// drain charges. The source row and the bulk column follow from charge
/// conservation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntrinsicCapacitances {
    pub cggb: f64,
    pub cgdb: f64,
    pub cgsb: f64,
    pub cbgb: f64,
    pub cbdb: f64,
    pub cbsb: f64,
    pub cdgb: f64,
    pub cddb: f64,
    pub cdsb: f64,
}

impl IntrinsicCapacitances {
    /// Full 4x4 capacitance matrix indexed by [`GATE`], [`DRAIN`], [`SOURCE`], [`BULK`].
    ///
    /// Every row and every column sums to zero.
    pub fn matrix(&self) -> [[f64; 4]; 4] {
        let mut c = [[0.0; 4]; 4];
        c[GATE][..3].copy_from_slice(&[self.cggb, self.cgdb, self.cgsb]);
        c[DRAIN][..3].copy_from_slice(&[self.cdgb, self.cddb, self.cdsb]);
        c[BULK][..3].copy_from_slice(&[self.cbgb, self.cbdb, self.cbsb]);
        for col in [GATE, DRAIN, SOURCE] {
            c[SOURCE][col] = -(c[GATE][col] + c[DRAIN][col] + c[BULK][col]);
        }
        for row in c.iter_mut() {
            row[BULK] = -(row[GATE] + row[DRAIN] + row[SOURCE]);
        }
        c
    }
}

/// Bulk junction conductances and depletion capacitances.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JunctionTerms {
    pub gbd: f64,
    pub gbs: f64,
    pub capbd: f64,
    pub capbs: f64,
}

/// Gate overlap capacitances, stamped as plain two-terminal capacitors.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlapCapacitances {
    pub cgdo: f64,
    pub cgso: f64,
    pub cgbo: f64,
}

/// Self-heating network.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThermalTerms {
    /// Thermal conductance to ambient (W/K).
    pub gth: f64,
    /// Thermal capacitance (J/K).
    pub cth: f64,
    /// Temperature derivative of the channel current (A/K).
    pub gmt: f64,
    /// Derivatives of dissipated power with respect to the canonical
    /// terminal voltages.
    pub power: [f64; 4],
}

/// Bias-dependent gate-charge conductance and its partial derivatives with
/// respect to the intrinsic gate, canonical drain, canonical source and bulk.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GateChargeTerms {
    pub gcrg: f64,
    pub gcrgg: f64,
    pub gcrgd: f64,
    pub gcrgs: f64,
    pub gcrgb: f64,
}

impl GateChargeTerms {
    /// Combine with an electrode conductance in series.
    ///
    /// The derivatives scale with `(ge / (ge + gcrg))^2`.
    pub fn in_series(&self, electrode: f64) -> GateChargeTerms {
        let total = electrode + self.gcrg;
        if total <= 0.0 {
            return GateChargeTerms::default();
        }
        let k = (electrode / total).powi(2);
        GateChargeTerms {
            gcrg: electrode * self.gcrg / total,
            gcrgg: self.gcrgg * k,
            gcrgd: self.gcrgd * k,
            gcrgs: self.gcrgs * k,
            gcrgb: self.gcrgb * k,
        }
    }
}

/// Gate tunnelling currents.
///
/// `igs` and `igd` flow through the physical overlap regions; `igcs` and
/// `igcd` are the channel current split to the canonical source and drain.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GateCurrents {
    pub igs: f64,
    pub igd: f64,
    pub igcs: f64,
    pub igcd: f64,
}

/// Polarity-normalized terminal voltages and currents at the last
/// linearization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiasPoint {
    pub vgs: f64,
    pub vds: f64,
    pub vbs: f64,
    /// Drain current through the channel.
    pub cd: f64,
    pub cbs: f64,
    pub cbd: f64,
}

/// Snapshot consumed by stamping, convergence and noise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FetOperatingPoint {
    pub bias: BiasPoint,
    pub channel: ChannelConductances,
    pub caps: IntrinsicCapacitances,
    pub junction: JunctionTerms,
    pub overlap: OverlapCapacitances,
    pub thermal: ThermalTerms,
    pub gate_charge: GateChargeTerms,
    pub gate_currents: GateCurrents,
}

impl FetOperatingPoint {
    /// Mode implied by the drain-source bias.
    pub fn mode(&self) -> OperatingMode {
        OperatingMode::from_bias(self.bias.vds)
    }
}

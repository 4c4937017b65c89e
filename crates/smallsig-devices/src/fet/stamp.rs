//! Small-signal stamp of the field-effect device.
//!
//! One function covers both operating modes. The mode only selects which
//! physical ports play the canonical drain and source; canonical terms are
//! then written onto those ports. Junction, overlap and series terms are
//! physical and ignore the mode.

use num_complex::Complex;
use smallsig_core::SparseMatrix;

use crate::error::Result;
use crate::fet::operating_point::{
    BULK, DRAIN, FetOperatingPoint, GATE, GateChargeTerms, SOURCE,
};
use crate::fet::params::{FetParams, GateNetwork};
use crate::fet::ports::{B, D, DP, G, GM, GP, S, SP, T};
use crate::stamp::{LocalBlock, StampSet};

/// Which extensions a stamp carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampVariant {
    /// Small-signal AC: self-heating and gate-charge sub-blocks included.
    Full,
    /// Pole-zero: extensions reduced to the plain resistances that keep
    /// internal nodes connected.
    PoleZero,
}

/// Reserve every location [`build`] can write.
pub(super) fn bind(
    block: &mut LocalBlock,
    matrix: &mut SparseMatrix,
    params: &FetParams,
) -> Result<()> {
    block.bind_dense(matrix, &[GP, DP, SP, B])?;
    let overlap = overlap_port(params);
    for port in [DP, SP, B] {
        block.bind_admittance(matrix, overlap, port)?;
    }
    block.bind_admittance(matrix, D, DP)?;
    block.bind_admittance(matrix, S, SP)?;

    match params.gate_network {
        GateNetwork::None => {}
        GateNetwork::Resistor { .. } => block.bind_admittance(matrix, G, GP)?,
        GateNetwork::TwoNode { .. } => {
            block.bind_admittance(matrix, G, GP)?;
            block.bind_row(matrix, G, &[DP, SP, B])?;
        }
        GateNetwork::ThreeNode { .. } => {
            block.bind_admittance(matrix, G, GM)?;
            block.bind_admittance(matrix, GM, GP)?;
            block.bind_row(matrix, GM, &[DP, SP, B])?;
        }
    }

    if params.self_heating {
        block.bind(matrix, T, T)?;
        block.bind_row(matrix, T, &[GP, DP, SP, B])?;
        block.bind_column(matrix, &[DP, SP], T)?;
    }
    Ok(())
}

/// Build the stamp set at complex frequency `s`.
pub(super) fn build(
    params: &FetParams,
    op: &FetOperatingPoint,
    s: Complex<f64>,
    variant: StampVariant,
) -> StampSet {
    let mut set = StampSet::with_capacity(64);
    let orient = super::ORIENTATION.select(op.mode());
    let mut canonical = [0; 4];
    canonical[GATE] = GP;
    canonical[DRAIN] = orient.drain;
    canonical[SOURCE] = orient.source;
    canonical[BULK] = B;

    // Intrinsic charge.
    let caps = op.caps.matrix();
    for (r, row) in caps.iter().enumerate() {
        for (c, &cap) in row.iter().enumerate() {
            set.add(canonical[r], canonical[c], s * cap);
        }
    }

    // Channel: current from canonical drain to canonical source.
    let ch = &op.channel;
    let (dp, sp) = (orient.drain, orient.source);
    let ssum = ch.gds + ch.gm + ch.gmbs;
    for (row, sign) in [(dp, 1.0), (sp, -1.0)] {
        set.add_real(row, GP, sign * ch.gm);
        set.add_real(row, dp, sign * ch.gds);
        set.add_real(row, sp, -sign * ssum);
        set.add_real(row, B, sign * ch.gmbs);
    }

    let j = &op.junction;
    set.admittance(B, DP, Complex::new(j.gbd, 0.0) + s * j.capbd);
    set.admittance(B, SP, Complex::new(j.gbs, 0.0) + s * j.capbs);

    let ov = &op.overlap;
    let overlap = overlap_port(params);
    set.admittance(overlap, DP, s * ov.cgdo);
    set.admittance(overlap, SP, s * ov.cgso);
    set.admittance(overlap, B, s * ov.cgbo);

    if params.drain_resistance > 0.0 {
        set.conductance(D, DP, 1.0 / params.drain_resistance);
    }
    if params.source_resistance > 0.0 {
        set.conductance(S, SP, 1.0 / params.source_resistance);
    }

    gate_network(&mut set, params, op, canonical, variant);

    if params.self_heating {
        let th = &op.thermal;
        match variant {
            StampVariant::Full => {
                set.add(T, T, Complex::new(th.gth, 0.0) + s * th.cth);
                set.add_real(dp, T, th.gmt);
                set.add_real(sp, T, -th.gmt);
                for (k, &dp_dv) in th.power.iter().enumerate() {
                    set.add_real(T, canonical[k], -dp_dv);
                }
            }
            // Thermal node stays tied to ambient, decoupled from the channel.
            StampVariant::PoleZero => set.add_real(T, T, th.gth),
        }
    }

    set
}

fn gate_network(
    set: &mut StampSet,
    params: &FetParams,
    op: &FetOperatingPoint,
    canonical: [usize; 4],
    variant: StampVariant,
) {
    match (params.gate_network, variant) {
        (GateNetwork::None, _) => {}
        (GateNetwork::Resistor { conductance }, _) => set.conductance(G, GP, conductance),
        (GateNetwork::TwoNode { electrode }, StampVariant::Full) => {
            charge_block(set, G, &op.gate_charge.in_series(electrode), canonical);
        }
        (GateNetwork::TwoNode { electrode }, StampVariant::PoleZero) => {
            set.conductance(G, GP, electrode);
        }
        (GateNetwork::ThreeNode { electrode }, StampVariant::Full) => {
            set.conductance(G, GM, electrode);
            charge_block(set, GM, &op.gate_charge, canonical);
        }
        (GateNetwork::ThreeNode { electrode }, StampVariant::PoleZero) => {
            set.conductance(G, GM, electrode);
            set.conductance(GM, GP, op.gate_charge.gcrg);
        }
    }
}

/// Bias-dependent gate-charge conductance between `outer` and the intrinsic gate.
fn charge_block(
    set: &mut StampSet,
    outer: usize,
    t: &GateChargeTerms,
    canonical: [usize; 4],
) {
    let cols = [
        (outer, t.gcrg),
        (GP, t.gcrgg - t.gcrg),
        (canonical[DRAIN], t.gcrgd),
        (canonical[SOURCE], t.gcrgs),
        (B, t.gcrgb),
    ];
    for (col, g) in cols {
        set.add_real(outer, col, g);
        set.add_real(GP, col, -g);
    }
}

fn overlap_port(params: &FetParams) -> usize {
    match params.gate_network {
        GateNetwork::ThreeNode { .. } => GM,
        _ => GP,
    }
}

//! Port roles of the field-effect device.
//!
//! External terminals come first, then the internal nodes. An internal
//! role whose element is absent aliases its external terminal (or ground,
//! for the thermal node) so stamping code never branches on topology.

/// Drain terminal.
pub const D: usize = 0;
/// Gate terminal.
pub const G: usize = 1;
/// Source terminal.
pub const S: usize = 2;
/// Bulk terminal.
pub const B: usize = 3;
/// Internal drain, behind the drain series resistance.
pub const DP: usize = 4;
/// Intrinsic gate, behind the gate network.
pub const GP: usize = 5;
/// Internal source, behind the source series resistance.
pub const SP: usize = 6;
/// Gate mid node of the three-node network.
pub const GM: usize = 7;
/// Thermal node.
pub const T: usize = 8;

pub const PORTS: usize = 9;

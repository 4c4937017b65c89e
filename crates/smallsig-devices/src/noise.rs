//! Device noise generators.

use smallsig_core::NodeId;

/// How a generator's density scales with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseKind {
    /// `2 q |I|` for a DC current `I` (A).
    Shot { current: f64 },
    /// `4 k T G` for a conductance `G` (S).
    Thermal { conductance: f64 },
    /// Density already computed by the device (A²/Hz), e.g. flicker noise.
    GainOnly { density: f64 },
}

/// Mean-square current noise injected between two nodes at one frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseGenerator {
    /// Stable name, e.g. `"M1.id"`. The same device reports the same names
    /// at every frequency.
    pub name: String,
    pub pos: NodeId,
    pub neg: NodeId,
    pub kind: NoiseKind,
}

impl NoiseGenerator {
    pub fn thermal(name: impl Into<String>, pos: NodeId, neg: NodeId, conductance: f64) -> Self {
        Self {
            name: name.into(),
            pos,
            neg,
            kind: NoiseKind::Thermal { conductance },
        }
    }

    pub fn shot(name: impl Into<String>, pos: NodeId, neg: NodeId, current: f64) -> Self {
        Self {
            name: name.into(),
            pos,
            neg,
            kind: NoiseKind::Shot { current },
        }
    }

    pub fn gain_only(name: impl Into<String>, pos: NodeId, neg: NodeId, density: f64) -> Self {
        Self {
            name: name.into(),
            pos,
            neg,
            kind: NoiseKind::GainOnly { density },
        }
    }
}

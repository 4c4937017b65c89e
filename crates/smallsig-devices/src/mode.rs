//! Canonical operating mode and per-mode recombination tables.
//!
//! A device's physical model is evaluated in one orientation only. When the
//! defining terminal voltage goes negative the device is in reverse mode and
//! the stamps are obtained by permuting ports through a [`ModeTable`], never
//! by evaluating the model a second time.

/// Canonical orientation of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    /// Defining voltage is non-negative; terminals keep their names.
    #[default]
    Forward,
    /// Defining voltage is negative; drain and source trade roles.
    Reverse,
}

impl OperatingMode {
    /// Mode for a defining terminal voltage (e.g. drain-source).
    ///
    /// Zero bias is forward.
    pub fn from_bias(voltage: f64) -> Self {
        if voltage >= 0.0 {
            OperatingMode::Forward
        } else {
            OperatingMode::Reverse
        }
    }

    /// True in reverse mode.
    pub fn is_reverse(self) -> bool {
        self == OperatingMode::Reverse
    }
}

/// One entry per mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeTable<T> {
    pub forward: T,
    pub reverse: T,
}

impl<T> ModeTable<T> {
    /// Entry for the given mode.
    pub fn select(&self, mode: OperatingMode) -> &T {
        match mode {
            OperatingMode::Forward => &self.forward,
            OperatingMode::Reverse => &self.reverse,
        }
    }
}

/// Which ports act as the canonical drain and source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    pub drain: usize,
    pub source: usize,
}

impl Orientation {
    /// Table that keeps `(drain, source)` in forward mode and swaps them in reverse.
    pub const fn table(drain: usize, source: usize) -> ModeTable<Orientation> {
        ModeTable {
            forward: Orientation { drain, source },
            reverse: Orientation {
                drain: source,
                source: drain,
            },
        }
    }
}

//! Small-signal circuit analysis.
//!
//! smallsig linearizes devices around an operating point supplied by the
//! caller and runs frequency-domain analyses on the result:
//!
//! - [`core`]: node numbering, the handle-addressed sparse matrix and the
//!   [`LinearSolver`](core::LinearSolver) service
//! - [`devices`]: the [`Device`](devices::Device) contract, linear elements,
//!   sources and a four-terminal field-effect model
//! - [`solver`]: the pausable sweep driver with AC, noise and
//!   transfer-function analyses
//!
//! Most programs only need the [`prelude`].

pub use smallsig_core as core;
pub use smallsig_devices as devices;
pub use smallsig_solver as solver;

pub mod prelude {
    pub use smallsig_core::{LinearSolver, NodeId, PhysicalConstants, SparseMatrix};
    pub use smallsig_devices::controlled::{Vccs, Vcvs};
    pub use smallsig_devices::fet::{Fet, FetOperatingPoint, FetParams};
    pub use smallsig_devices::passive::{Capacitor, Inductor, Resistor};
    pub use smallsig_devices::sources::{CurrentSource, VoltageSource};
    pub use smallsig_devices::{Circuit, Device, NoiseGenerator, NoiseKind};
    pub use smallsig_solver::{
        AcSpec, Error, FixedOperatingPoint, FrequencySweep, NoiseMode, NoiseSpec, Result,
        SimOptions, SparseLu, SweepJob, SweepPoint, SweepStatus, TransferFunctionSpec,
        TransferOutput,
    };
}

//! Independent sweep cycles on a rayon pool.
//!
//! Each cycle builds its own circuit, so matrices, right-hand sides and
//! device operating points are never shared between workers. The solver is
//! shared read-only.

use log::info;
use rayon::prelude::*;
use smallsig_core::LinearSolver;
use smallsig_devices::Circuit;

use crate::error::Result;
use crate::options::SimOptions;
use crate::sweep::{AnalysisSpec, FixedOperatingPoint, SweepAnalysis, SweepJob};

/// Builds the circuit for one cycle, e.g. with per-cycle parameter values.
pub trait CircuitFactory: Sync {
    fn build(&self, cycle: usize) -> Result<Circuit>;
}

impl<F> CircuitFactory for F
where
    F: Fn(usize) -> Result<Circuit> + Sync,
{
    fn build(&self, cycle: usize) -> Result<Circuit> {
        self(cycle)
    }
}

/// Run `spec` to completion on `cycles` independent circuits.
///
/// Results come back in cycle order; a failing cycle does not stop the
/// others.
pub fn run_cycles<S>(
    factory: &dyn CircuitFactory,
    cycles: usize,
    spec: &S,
    solver: &dyn LinearSolver,
    options: &SimOptions,
) -> Vec<Result<<S::Analysis as SweepAnalysis>::Output>>
where
    S: AnalysisSpec + Clone + Sync,
    <S::Analysis as SweepAnalysis>::Output: Send,
{
    info!(
        "running {} sweep cycles on {} threads",
        cycles,
        rayon::current_num_threads()
    );
    (0..cycles)
        .into_par_iter()
        .map(|cycle| {
            let mut circuit = factory.build(cycle)?;
            let mut job = SweepJob::begin(
                &mut circuit,
                solver,
                spec.clone(),
                FixedOperatingPoint,
                options,
            )?;
            job.run()?;
            Ok(job.finish())
        })
        .collect()
}

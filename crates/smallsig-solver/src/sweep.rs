//! Point-atomic sweep driver.
//!
//! A [`SweepJob`] walks an analysis over its points in ascending order. Each
//! [`SweepJob::step`] runs one complete point: refresh the operating point,
//! clear and restamp the circuit matrix, let the analysis solve, then commit
//! the point's results. A point either commits fully or not at all, so the
//! driver can pause, resume, retry or cancel between any two points.
//!
//! ```ignore
//! let mut job = SweepJob::begin(&mut circuit, &SparseLu::default(), spec, FixedOperatingPoint, &opts)?;
//! while job.step()? == SweepStatus::Continue {}
//! let result = job.finish();
//! ```

use std::f64::consts::PI;

use log::{debug, info, warn};
use smallsig_core::LinearSolver;
use smallsig_devices::Circuit;

use crate::error::{Error, Result};
use crate::options::SimOptions;

/// Bytes reserved per result value when estimating output size.
pub const BYTES_PER_VALUE: usize = 16;

/// Frequency sweep description.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrequencySweep {
    /// `points` evenly spaced frequencies from `start` to `stop`.
    Linear { start: f64, stop: f64, points: usize },
    /// Logarithmic spacing with `points_per_decade` per decade.
    Decade {
        start: f64,
        stop: f64,
        points_per_decade: usize,
    },
    /// Logarithmic spacing with `points_per_octave` per octave.
    Octave {
        start: f64,
        stop: f64,
        points_per_octave: usize,
    },
    /// Explicit, strictly ascending values.
    List(Vec<f64>),
}

impl FrequencySweep {
    pub fn linear(start: f64, stop: f64, points: usize) -> Self {
        FrequencySweep::Linear {
            start,
            stop,
            points,
        }
    }

    pub fn decade(start: f64, stop: f64, points_per_decade: usize) -> Self {
        FrequencySweep::Decade {
            start,
            stop,
            points_per_decade,
        }
    }

    pub fn octave(start: f64, stop: f64, points_per_octave: usize) -> Self {
        FrequencySweep::Octave {
            start,
            stop,
            points_per_octave,
        }
    }

    /// Generate the sweep values in ascending order.
    pub fn points(&self) -> Result<Vec<f64>> {
        let points = match *self {
            FrequencySweep::Linear {
                start,
                stop,
                points,
            } => {
                check_range(start, stop, points, false)?;
                if points == 1 {
                    vec![start]
                } else {
                    let step = (stop - start) / (points - 1) as f64;
                    (0..points).map(|i| start + i as f64 * step).collect()
                }
            }
            FrequencySweep::Decade {
                start,
                stop,
                points_per_decade,
            } => {
                check_range(start, stop, points_per_decade, true)?;
                log_spaced(start, stop, (stop / start).log10(), points_per_decade)
            }
            FrequencySweep::Octave {
                start,
                stop,
                points_per_octave,
            } => {
                check_range(start, stop, points_per_octave, true)?;
                log_spaced(start, stop, (stop / start).log2(), points_per_octave)
            }
            FrequencySweep::List(ref values) => {
                if values.is_empty() {
                    return Err(Error::InvalidSweep("empty value list".to_string()));
                }
                if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                    return Err(Error::InvalidSweep(format!("non-finite value {bad}")));
                }
                if let Some(w) = values.windows(2).find(|w| w[1] <= w[0]) {
                    return Err(Error::InvalidSweep(format!(
                        "values must ascend strictly, {} follows {}",
                        w[1], w[0]
                    )));
                }
                values.clone()
            }
        };
        Ok(points)
    }
}

fn check_range(start: f64, stop: f64, points: usize, logarithmic: bool) -> Result<()> {
    if points == 0 {
        return Err(Error::InvalidSweep("sweep needs at least one point".to_string()));
    }
    if !start.is_finite() || !stop.is_finite() {
        return Err(Error::InvalidSweep(format!("non-finite range {start}..{stop}")));
    }
    if logarithmic && start <= 0.0 {
        return Err(Error::InvalidSweep(format!(
            "logarithmic sweep must start above zero, got {start}"
        )));
    }
    if stop < start {
        return Err(Error::InvalidSweep(format!(
            "stop {stop} is below start {start}"
        )));
    }
    // Log sweeps collapse a zero-width range to one point.
    if !logarithmic && stop == start && points > 1 {
        return Err(Error::InvalidSweep(format!(
            "{points} points cannot ascend strictly over {start}..{stop}"
        )));
    }
    Ok(())
}

/// Evenly spaced in log, both ends included.
fn log_spaced(start: f64, stop: f64, spans: f64, per_span: usize) -> Vec<f64> {
    // Absorb rounding in `spans` so exact decades do not gain a point.
    let total = (spans * per_span as f64 - 1e-9).ceil().max(0.0) as usize + 1;
    if total < 2 || stop == start {
        return vec![start];
    }
    let (ln_start, ln_stop) = (start.ln(), stop.ln());
    let step = (ln_stop - ln_start) / (total - 1) as f64;
    (0..total)
        .map(|i| {
            if i == total - 1 {
                stop
            } else {
                (ln_start + i as f64 * step).exp()
            }
        })
        .collect()
}

/// One point of a running sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    /// Position in the sweep, starting at 0.
    pub index: usize,
    /// Swept value: frequency in Hz, or a parameter value for DC-like sweeps.
    pub value: f64,
}

impl SweepPoint {
    /// `2 pi f`.
    pub fn omega(&self) -> f64 {
        2.0 * PI * self.value
    }
}

/// Outcome of one [`SweepJob::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    /// A point was committed and more remain.
    Continue,
    /// A point was committed and the job honoured a pause request.
    Paused,
    /// The last point was committed and results are flushed.
    Done,
}

/// Establishes device operating points before a sweep point is stamped.
pub trait OperatingPointProvider {
    fn establish(&mut self, circuit: &mut Circuit, point: &SweepPoint) -> Result<()>;
}

/// Keeps whatever operating points the devices already hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOperatingPoint;

impl OperatingPointProvider for FixedOperatingPoint {
    fn establish(&mut self, _circuit: &mut Circuit, _point: &SweepPoint) -> Result<()> {
        Ok(())
    }
}

impl<F> OperatingPointProvider for F
where
    F: FnMut(&mut Circuit, &SweepPoint) -> Result<()>,
{
    fn establish(&mut self, circuit: &mut Circuit, point: &SweepPoint) -> Result<()> {
        self(circuit, point)
    }
}

/// An analysis descriptor, resolved against a circuit when a sweep begins.
pub trait AnalysisSpec {
    type Analysis: SweepAnalysis;

    /// Set the circuit up, resolve names and allocate accumulators.
    fn resolve(self, circuit: &mut Circuit, options: &SimOptions) -> Result<Self::Analysis>;
}

/// Per-point computation and accumulation of one analysis.
///
/// `compute` may fail and must not change the analysis; `commit` cannot
/// fail. The driver only commits a point whose computation succeeded.
pub trait SweepAnalysis {
    /// Everything one point contributes, held until commit.
    type Staged;
    /// Snapshot handed to callers.
    type Output;

    /// Ascending sweep values.
    fn points(&self) -> &[f64];

    /// Angular frequency at which devices stamp for `point`.
    fn angular_frequency(&self, point: &SweepPoint) -> f64;

    /// Estimated `(rows, columns)` of the complete output.
    fn output_shape(&self) -> (usize, usize);

    /// Solve against the freshly stamped circuit.
    fn compute(
        &self,
        circuit: &Circuit,
        solver: &dyn LinearSolver,
        point: &SweepPoint,
    ) -> Result<Self::Staged>;

    /// Fold one computed point into the accumulators.
    fn commit(&mut self, point: &SweepPoint, staged: Self::Staged);

    /// Called once after the last point commits.
    fn finish(&mut self) {}

    /// Results accumulated so far.
    fn results(&self) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Running,
    Done,
    Cancelled,
}

/// A resumable sweep over one analysis.
pub struct SweepJob<'c, A: SweepAnalysis, P: OperatingPointProvider = FixedOperatingPoint> {
    circuit: &'c mut Circuit,
    solver: &'c dyn LinearSolver,
    provider: P,
    analysis: A,
    next: usize,
    pause_requested: bool,
    state: JobState,
}

impl<'c, A: SweepAnalysis, P: OperatingPointProvider> SweepJob<'c, A, P> {
    /// Resolve `spec` against `circuit` and check the output budget.
    ///
    /// Fails with `NodeUndefined`/`SourceUndefined` for unresolved names and
    /// with [`Error::OutputBudgetExceeded`] before any point runs.
    pub fn begin<S>(
        circuit: &'c mut Circuit,
        solver: &'c dyn LinearSolver,
        spec: S,
        provider: P,
        options: &SimOptions,
    ) -> Result<Self>
    where
        S: AnalysisSpec<Analysis = A>,
    {
        let analysis = spec.resolve(circuit, options)?;
        let (rows, columns) = analysis.output_shape();
        let estimated = rows
            .saturating_mul(columns)
            .saturating_mul(BYTES_PER_VALUE);
        if estimated > options.max_output_bytes {
            return Err(Error::OutputBudgetExceeded {
                estimated,
                budget: options.max_output_bytes,
            });
        }
        info!(
            "sweep begins: {} points, {} unknowns, ~{} bytes of output",
            analysis.points().len(),
            circuit.size(),
            estimated
        );
        Ok(Self {
            circuit,
            solver,
            provider,
            analysis,
            next: 0,
            pause_requested: false,
            state: JobState::Running,
        })
    }

    /// Run one sweep point to completion.
    ///
    /// On error nothing from the point is kept and the same point runs again
    /// on the next call.
    pub fn step(&mut self) -> Result<SweepStatus> {
        match self.state {
            JobState::Done => return Err(Error::SweepFinished),
            JobState::Cancelled => return Err(Error::SweepCancelled),
            JobState::Running => {}
        }
        let Some(&value) = self.analysis.points().get(self.next) else {
            return Ok(self.complete());
        };
        let point = SweepPoint {
            index: self.next,
            value,
        };

        self.provider.establish(self.circuit, &point)?;
        self.circuit
            .load_ac(self.analysis.angular_frequency(&point))?;
        let staged = self.analysis.compute(self.circuit, self.solver, &point)?;
        self.analysis.commit(&point, staged);
        self.next += 1;
        debug!(
            "sweep point {}/{} at {:.6e} committed",
            self.next,
            self.analysis.points().len(),
            value
        );

        if self.next == self.analysis.points().len() {
            Ok(self.complete())
        } else if self.pause_requested {
            self.pause_requested = false;
            Ok(SweepStatus::Paused)
        } else {
            Ok(SweepStatus::Continue)
        }
    }

    /// Step until the sweep pauses or finishes.
    pub fn run(&mut self) -> Result<SweepStatus> {
        loop {
            match self.step()? {
                SweepStatus::Continue => {}
                status => return Ok(status),
            }
        }
    }

    /// Ask the job to pause after the next committed point.
    pub fn request_pause(&mut self) {
        self.pause_requested = true;
    }

    /// Stop the sweep. Committed points stay in the results.
    pub fn cancel(&mut self) {
        if self.state == JobState::Running {
            if self.pause_requested {
                warn!("sweep cancelled with a pause still pending");
            }
            info!("sweep cancelled after {} points", self.next);
            self.state = JobState::Cancelled;
        }
    }

    /// Points committed so far.
    pub fn completed(&self) -> usize {
        self.next
    }

    /// Value of the last committed point.
    pub fn last_value(&self) -> Option<f64> {
        self.next
            .checked_sub(1)
            .and_then(|i| self.analysis.points().get(i).copied())
    }

    pub fn is_done(&self) -> bool {
        self.state == JobState::Done
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == JobState::Cancelled
    }

    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Results accumulated so far.
    pub fn results(&self) -> A::Output {
        self.analysis.results()
    }

    /// Release the circuit and return the final results.
    pub fn finish(self) -> A::Output {
        self.analysis.results()
    }

    fn complete(&mut self) -> SweepStatus {
        self.analysis.finish();
        self.state = JobState::Done;
        info!("sweep done: {} points", self.next);
        SweepStatus::Done
    }
}

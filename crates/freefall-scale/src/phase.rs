use serde::{Deserialize, Serialize};

use crate::{
    config::PhaseIsolationKind, differentiate::gradient, differentiate::KinematicSeries,
    error::ScaleError,
};

/// Samples retained by a phase isolation strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolatedPhase {
    /// Name of the strategy that produced the selection.
    pub strategy: String,
    /// Indices into the source series, increasing.
    pub indices: Vec<usize>,
    /// Time subgrid of the retained samples.
    pub time: Vec<f64>,
    /// Acceleration recomputed over the retained velocity subsequence.
    pub acceleration: Vec<f64>,
}

impl IsolatedPhase {
    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether no sample was retained.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Trait for phase isolation strategies.
///
/// A recording usually holds more than the drop itself: the camera is held,
/// released, caught. Implementations pick the samples that look like
/// ballistic flight from the sign of velocity and acceleration. They assume a
/// single flight phase; a recording with bounces or no flight at all can
/// yield a wrong or empty selection.
pub trait PhaseIsolation {
    /// Name used in logs and results.
    fn name(&self) -> &'static str;

    /// Select the samples of `series` that belong to the free-fall phase.
    fn isolate(&self, series: &KinematicSeries) -> Result<IsolatedPhase, ScaleError>;
}

/// Build the strategy selected by `kind`.
pub fn isolation_strategy(kind: PhaseIsolationKind) -> Box<dyn PhaseIsolation> {
    match kind {
        PhaseIsolationKind::SignMask => Box::new(SignMaskIsolation),
        PhaseIsolationKind::LongestRun => Box::new(LongestRunIsolation),
    }
}

/// Keeps samples with positive velocity, recomputes acceleration over them
/// and keeps the negative accelerations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignMaskIsolation;

impl PhaseIsolation for SignMaskIsolation {
    fn name(&self) -> &'static str {
        "sign_mask"
    }

    fn isolate(&self, series: &KinematicSeries) -> Result<IsolatedPhase, ScaleError> {
        let rising = (0..series.len())
            .filter(|&i| series.smoothed.velocity[i] > 0.0)
            .collect::<Vec<_>>();
        decelerating_subset(self.name(), series, rising)
    }
}

/// Keeps the longest contiguous run of positive velocity, recomputes
/// acceleration over it and keeps the negative accelerations.
///
/// Shorter rising segments, such as a bounce after the catch, are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestRunIsolation;

impl PhaseIsolation for LongestRunIsolation {
    fn name(&self) -> &'static str {
        "longest_run"
    }

    fn isolate(&self, series: &KinematicSeries) -> Result<IsolatedPhase, ScaleError> {
        let velocity = &series.smoothed.velocity;

        let mut best = 0..0;
        let mut start = None;
        for i in 0..=velocity.len() {
            let rising = i < velocity.len() && velocity[i] > 0.0;
            match (rising, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s > best.len() {
                        best = s..i;
                    }
                    start = None;
                }
                _ => {}
            }
        }

        decelerating_subset(self.name(), series, best.collect())
    }
}

fn decelerating_subset(
    strategy: &'static str,
    series: &KinematicSeries,
    rising: Vec<usize>,
) -> Result<IsolatedPhase, ScaleError> {
    if rising.is_empty() {
        return Err(ScaleError::EmptyFilteredSeries {
            strategy,
            step: "velocity mask",
        });
    }

    let time = rising.iter().map(|&i| series.time[i]).collect::<Vec<_>>();
    let velocity = rising
        .iter()
        .map(|&i| series.smoothed.velocity[i])
        .collect::<Vec<_>>();

    // a single retained sample has no derivative
    if rising.len() < 2 {
        return Err(ScaleError::InsufficientFrames {
            stage: "phase isolation",
            required: 2,
            actual: rising.len(),
        });
    }
    let acceleration = gradient(&velocity, &time)?;

    let keep = (0..rising.len())
        .filter(|&k| acceleration[k] < 0.0)
        .collect::<Vec<_>>();
    if keep.is_empty() {
        return Err(ScaleError::EmptyFilteredSeries {
            strategy,
            step: "acceleration mask",
        });
    }

    log::debug!(
        "phase isolation '{}' kept {} of {} samples",
        strategy,
        keep.len(),
        series.len()
    );

    Ok(IsolatedPhase {
        strategy: strategy.to_string(),
        indices: keep.iter().map(|&k| rising[k]).collect(),
        time: keep.iter().map(|&k| time[k]).collect(),
        acceleration: keep.iter().map(|&k| acceleration[k]).collect(),
    })
}

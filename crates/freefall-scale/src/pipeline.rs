use crate::{
    config::ScaleConfig,
    differentiate::KinematicSeries,
    error::ScaleError,
    estimate::{scale_solver, FitInput},
    phase::{isolation_strategy, IsolatedPhase},
    pose::PoseRecord,
    result::{assemble_output, AssembledOutput, ModelCurve},
    trajectory::Trajectory,
};

/// Samples handed to the scale solver, referenced to the window start.
struct FitWindow {
    time_offset: f64,
    displacement_offset: f64,
    time: Vec<f64>,
    displacement: Vec<f64>,
    acceleration: Vec<f64>,
    raw_acceleration: Vec<f64>,
    decelerating: bool,
}

impl FitWindow {
    fn full(series: &KinematicSeries) -> Self {
        Self {
            time_offset: 0.0,
            displacement_offset: 0.0,
            time: series.time.clone(),
            displacement: series.raw.displacement.clone(),
            acceleration: series.smoothed.acceleration.clone(),
            raw_acceleration: series.raw.acceleration.clone(),
            decelerating: false,
        }
    }

    fn isolated(series: &KinematicSeries, phase: &IsolatedPhase) -> Self {
        // phase isolation never returns an empty selection
        let first = phase.indices[0];
        let time_offset = series.time[first];
        let displacement_offset = series.raw.displacement[first];
        Self {
            time_offset,
            displacement_offset,
            time: phase
                .indices
                .iter()
                .map(|&i| series.time[i] - time_offset)
                .collect(),
            displacement: phase
                .indices
                .iter()
                .map(|&i| series.raw.displacement[i] - displacement_offset)
                .collect(),
            acceleration: phase.acceleration.clone(),
            raw_acceleration: phase
                .indices
                .iter()
                .map(|&i| series.raw.acceleration[i])
                .collect(),
            // isolation keeps negative accelerations only
            decelerating: true,
        }
    }

    fn as_input(&self) -> FitInput<'_> {
        FitInput {
            time: &self.time,
            displacement: &self.displacement,
            acceleration: &self.acceleration,
            raw_acceleration: &self.raw_acceleration,
            decelerating: self.decelerating,
        }
    }
}

/// Recover the metric scale factor of a trajectory from a free-fall event.
///
/// Runs every stage in order: trajectory from poses, kinematic curves,
/// optional phase isolation, scale estimation and result packaging.
///
/// # Arguments
///
/// * `poses` - The pose records of the recording, one per frame.
/// * `config` - The run configuration.
///
/// # Returns
///
/// The packaged curves and scale estimate.
///
/// Example:
///
/// ```
/// use freefall_scale::{estimate_scale, PoseRecord, ScaleConfig};
///
/// // a camera thrown along x, decelerating at 0.0817 units/s^2
/// let dt = 1.0 / 240.0;
/// let poses = (0..100)
///     .map(|i| {
///         let t = i as f64 * dt;
///         let s = 0.5 * t - 0.5 * 0.0817 * t * t;
///         PoseRecord::new(format!("frame_{i}"), [1.0, 0.0, 0.0, 0.0], [-s, 0.0, 0.0])
///     })
///     .collect::<Vec<_>>();
///
/// let output = estimate_scale(&poses, &ScaleConfig::default()).unwrap();
/// assert!((output.estimate.scale_factor - 9.8 / 0.0817).abs() < 0.1);
/// ```
pub fn estimate_scale(
    poses: &[PoseRecord],
    config: &ScaleConfig,
) -> Result<AssembledOutput, ScaleError> {
    config.validate()?;

    let trajectory = Trajectory::from_poses(poses, config.frame_interval_seconds)?;
    let series = KinematicSeries::compute(
        &trajectory.timestamps(),
        &trajectory.displacement_magnitudes(),
        config.smoothing_window,
    )?;

    let isolated_phase = match config.enable_phase_isolation {
        true => Some(isolation_strategy(config.phase_isolation).isolate(&series)?),
        false => None,
    };
    let window = match &isolated_phase {
        Some(phase) => FitWindow::isolated(&series, phase),
        None => FitWindow::full(&series),
    };

    let solver = scale_solver(config);
    let estimate = solver.solve(&window.as_input(), config.gravity_reference_m_s2)?;

    if !estimate.scale_factor.is_finite() {
        return Err(ScaleError::NonFiniteResult {
            stage: "scale factor",
            index: 0,
            value: estimate.scale_factor,
        });
    }
    if estimate.scale_factor < 0.0 {
        log::warn!(
            "negative scale factor {}: the motion does not match the {:?} sign convention",
            estimate.scale_factor,
            estimate.method
        );
    }

    let model = estimate.fit_params.map(|params| ModelCurve {
        time: window.time.iter().map(|t| t + window.time_offset).collect(),
        displacement: window
            .time
            .iter()
            .map(|&t| params.displacement_at(t) + window.displacement_offset)
            .collect(),
    });

    log::info!(
        "{:?} scale factor {} from {} poses",
        estimate.method,
        estimate.scale_factor,
        poses.len()
    );

    assemble_output(trajectory, series, isolated_phase, estimate, model)
}

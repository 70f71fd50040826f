use serde::{Deserialize, Serialize};

use crate::{
    differentiate::{KinematicCurves, KinematicSeries},
    error::{ensure_finite, ScaleError},
    estimate::ScaleEstimate,
    phase::IsolatedPhase,
    trajectory::Trajectory,
};

/// Kinematic curves multiplied by the scale factor, in metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledCurves {
    /// Scaled raw curves.
    pub raw: KinematicCurves,
    /// Scaled smoothed curves.
    pub smoothed: KinematicCurves,
}

/// The fitted kinematic model sampled on the fit window, in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCurve {
    /// Absolute sample times.
    pub time: Vec<f64>,
    /// Model displacement, offset to overlay the scaled displacement curve.
    pub displacement: Vec<f64>,
}

/// Everything a plotting or reporting sink needs from one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledOutput {
    /// Frame identifiers in processing order.
    pub identifiers: Vec<String>,
    /// Time grid, seconds.
    pub time: Vec<f64>,
    /// Camera centers, reconstruction units.
    pub positions: Vec<[f64; 3]>,
    /// Per-axis displacement from the first frame, reconstruction units.
    pub displacement_xyz: Vec<[f64; 3]>,
    /// Unscaled raw curves.
    pub raw: KinematicCurves,
    /// Unscaled smoothed curves.
    pub smoothed: KinematicCurves,
    /// Curves in metric units.
    pub scaled: ScaledCurves,
    /// Samples retained by phase isolation, if enabled.
    pub isolated_phase: Option<IsolatedPhase>,
    /// Fitted model, least squares only.
    pub model: Option<ModelCurve>,
    /// The scale estimate.
    pub estimate: ScaleEstimate,
}

/// Package the outputs of every stage into one result.
///
/// # Arguments
///
/// * `trajectory` - The trajectory built from the poses.
/// * `series` - The kinematic curves of the trajectory.
/// * `isolated_phase` - The isolated free-fall phase, if any.
/// * `estimate` - The scale estimate.
/// * `model` - The model curve in reconstruction units, least squares only.
///
/// # Errors
///
/// `NonFiniteResult` when scaling pushes a value out of range.
pub fn assemble_output(
    trajectory: Trajectory,
    series: KinematicSeries,
    isolated_phase: Option<IsolatedPhase>,
    estimate: ScaleEstimate,
    model: Option<ModelCurve>,
) -> Result<AssembledOutput, ScaleError> {
    let scale = estimate.scale_factor;

    let scaled = ScaledCurves {
        raw: series.raw.scaled(scale),
        smoothed: series.smoothed.scaled(scale),
    };
    for curves in [&scaled.raw, &scaled.smoothed] {
        ensure_finite("scaled displacement", &curves.displacement)?;
        ensure_finite("scaled velocity", &curves.velocity)?;
        ensure_finite("scaled acceleration", &curves.acceleration)?;
        ensure_finite("scaled jerk", &curves.jerk)?;
    }

    let model = model.map(|m| ModelCurve {
        time: m.time,
        displacement: m.displacement.iter().map(|s| s * scale).collect(),
    });
    if let Some(m) = &model {
        ensure_finite("scaled model", &m.displacement)?;
    }

    Ok(AssembledOutput {
        positions: trajectory.positions(),
        displacement_xyz: trajectory.displacements(),
        identifiers: trajectory.identifiers,
        time: series.time,
        raw: series.raw,
        smoothed: series.smoothed,
        scaled,
        isolated_phase,
        model,
        estimate,
    })
}

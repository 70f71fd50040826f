use approx::assert_relative_eq;
use freefall_scale::{
    estimate_scale, pose::quaternion_to_rotation_matrix, PoseRecord, ScaleConfig, ScaleError,
    ScaleMethod,
};
use rand::{Rng, SeedableRng};

/// Quaternion `(w, x, y, z)` for a rotation of `angle` about `axis`.
fn axis_angle_quaternion(axis: [f64; 3], angle: f64) -> [f64; 4] {
    let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    let (s, c) = (0.5 * angle).sin_cos();
    [c, s * axis[0] / norm, s * axis[1] / norm, s * axis[2] / norm]
}

/// Pose whose camera center sits at `center`: `t = -R C`.
fn pose_with_center(name: String, q: [f64; 4], center: [f64; 3]) -> PoseRecord {
    let r = quaternion_to_rotation_matrix(&q);
    let mut t = [0.0; 3];
    for (i, ti) in t.iter_mut().enumerate() {
        *ti = -(r[i][0] * center[0] + r[i][1] * center[1] + r[i][2] * center[2]);
    }
    PoseRecord::new(name, q, t)
}

/// A camera thrown along `direction` with a slowly spinning orientation,
/// expressed in reconstruction units `1 / scale` of the metric motion.
fn synthetic_throw(
    n: usize,
    dt: f64,
    u_true: f64,
    g_true: f64,
    scale_true: f64,
    noise: f64,
    seed: u64,
) -> Vec<PoseRecord> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let direction = [0.36, 0.48, 0.8];
    let origin = [1.5, -0.7, 4.2];

    (0..n)
        .map(|i| {
            let t = i as f64 * dt;
            let s = (u_true * t - 0.5 * g_true * t * t) / scale_true;
            let mut center = [0.0; 3];
            for k in 0..3 {
                center[k] = origin[k] + direction[k] * s;
                if i > 0 && noise > 0.0 {
                    center[k] += rng.random_range(-noise..noise);
                }
            }
            let q = axis_angle_quaternion([0.2, 1.0, -0.3], 0.4 + 2.0 * t);
            pose_with_center(format!("frame_{i:04}"), q, center)
        })
        .collect()
}

#[test]
fn round_trip_scale_recovery() -> Result<(), ScaleError> {
    let scale_true = 37.5;
    let poses = synthetic_throw(150, 1.0 / 240.0, 4.0, 9.8, scale_true, 0.0, 0);

    let output = estimate_scale(&poses, &ScaleConfig::default())?;
    let estimate = output.estimate;

    assert_eq!(estimate.method, ScaleMethod::LeastSquares);
    assert_relative_eq!(estimate.scale_factor, scale_true, max_relative = 1e-3);

    let params = estimate.fit_params.expect("least squares reports fit params");
    assert_relative_eq!(params.u_scaled, 4.0, max_relative = 1e-3);
    assert_relative_eq!(params.g_scaled, 9.8, max_relative = 1e-9);

    let stats = estimate
        .residual_stats
        .expect("least squares reports residuals");
    assert!(stats.mae < 1e-6, "mae {}", stats.mae);
    assert!(stats.rmse < 1e-6, "rmse {}", stats.rmse);
    Ok(())
}

#[test]
fn concrete_scenario_240fps() -> Result<(), ScaleError> {
    // u = 0.5 and g = 0.0817 in reconstruction units, i.e. scale 1
    let poses = synthetic_throw(100, 1.0 / 240.0, 0.5, 0.0817, 1.0, 0.0, 0);
    let config = ScaleConfig {
        frame_interval_seconds: 1.0 / 240.0,
        gravity_reference_m_s2: 9.8,
        ..Default::default()
    };
    let output = estimate_scale(&poses, &config)?;
    assert_relative_eq!(output.estimate.scale_factor, 9.8 / 0.0817, max_relative = 1e-3);
    assert_relative_eq!(output.estimate.scale_factor, 119.95, max_relative = 1e-3);
    assert_eq!(output.raw.displacement[0], 0.0);
    Ok(())
}

#[test]
fn noisy_scale_recovery() -> Result<(), ScaleError> {
    let scale_true = 12.0;
    let poses = synthetic_throw(240, 1.0 / 240.0, 6.0, 9.8, scale_true, 1e-5, 7);

    let output = estimate_scale(&poses, &ScaleConfig::default())?;
    assert_relative_eq!(output.estimate.scale_factor, scale_true, max_relative = 2e-2);

    // noise shows up in the residuals but stays at the sub-millimeter level
    let stats = output
        .estimate
        .residual_stats
        .expect("least squares reports residuals");
    assert!(stats.rmse > 0.0);
    assert!(stats.rmse < 1e-3, "rmse {}", stats.rmse);
    Ok(())
}

#[test]
fn natural_order_is_applied_before_differentiation() -> Result<(), ScaleError> {
    let mut poses = synthetic_throw(100, 1.0 / 240.0, 0.5, 0.0817, 1.0, 0.0, 0)
        .into_iter()
        .enumerate()
        .map(|(i, mut p)| {
            p.identifier = format!("frame_{i}");
            p
        })
        .collect::<Vec<_>>();
    poses.reverse();

    let output = estimate_scale(&poses, &ScaleConfig::default())?;
    assert_eq!(output.identifiers[..3], ["frame_0", "frame_1", "frame_2"]);
    assert_eq!(output.identifiers[99], "frame_99");
    assert_relative_eq!(output.estimate.scale_factor, 119.95, max_relative = 1e-3);
    Ok(())
}

#[test]
fn output_serializes_to_json() -> Result<(), Box<dyn std::error::Error>> {
    let poses = synthetic_throw(50, 1.0 / 240.0, 0.5, 0.0817, 1.0, 0.0, 0);
    let output = estimate_scale(&poses, &ScaleConfig::default())?;

    let json = serde_json::to_value(&output)?;
    assert_eq!(json["estimate"]["method"], "least_squares");
    assert_eq!(
        json["scaled"]["smoothed"]["velocity"]
            .as_array()
            .map(|a| a.len()),
        Some(50)
    );
    Ok(())
}

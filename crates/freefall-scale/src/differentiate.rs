use serde::{Deserialize, Serialize};

use crate::{
    error::{ensure_finite, ScaleError},
    kernels,
};

fn check_grid(values: &[f64], times: &[f64]) -> Result<(), ScaleError> {
    if values.len() != times.len() {
        return Err(ScaleError::LengthMismatch {
            stage: "gradient",
            left_name: "values",
            left_len: values.len(),
            right_name: "times",
            right_len: times.len(),
        });
    }
    if values.len() < 2 {
        return Err(ScaleError::InsufficientFrames {
            stage: "gradient",
            required: 2,
            actual: values.len(),
        });
    }
    if let Some(i) = (1..times.len()).find(|&i| !(times[i] > times[i - 1])) {
        return Err(ScaleError::NonMonotonicTime {
            index: i,
            previous: times[i - 1],
            current: times[i],
        });
    }
    Ok(())
}

/// Compute the finite-difference derivative of a series over a time grid.
///
/// Interior samples use the central difference
/// `(s[i+1] - s[i-1]) / (t[i+1] - t[i-1])`, the first and last samples use
/// a forward and a backward difference. The grid may be non-uniform.
///
/// # Arguments
///
/// * `values` - The series to differentiate.
/// * `times` - The strictly increasing time grid, same length as `values`.
///
/// # Returns
///
/// The derivative, same length as the input.
///
/// Example:
///
/// ```
/// use freefall_scale::differentiate::gradient;
///
/// let d = gradient(&[0.0, 1.0, 4.0], &[0.0, 1.0, 2.0]).unwrap();
/// assert_eq!(d, vec![1.0, 2.0, 3.0]);
/// ```
pub fn gradient(values: &[f64], times: &[f64]) -> Result<Vec<f64>, ScaleError> {
    check_grid(values, times)?;

    let n = values.len();
    let mut dst = Vec::with_capacity(n);

    dst.push((values[1] - values[0]) / (times[1] - times[0]));
    for i in 1..n - 1 {
        dst.push((values[i + 1] - values[i - 1]) / (times[i + 1] - times[i - 1]));
    }
    dst.push((values[n - 1] - values[n - 2]) / (times[n - 1] - times[n - 2]));

    ensure_finite("gradient", &dst)?;
    Ok(dst)
}

/// A set of kinematic curves sharing one time grid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KinematicCurves {
    /// Displacement magnitude.
    pub displacement: Vec<f64>,
    /// First derivative of `displacement`.
    pub velocity: Vec<f64>,
    /// Second derivative of `displacement`.
    pub acceleration: Vec<f64>,
    /// Third derivative of `displacement`.
    pub jerk: Vec<f64>,
}

impl KinematicCurves {
    /// Multiply every curve by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |v: &[f64]| v.iter().map(|x| x * factor).collect::<Vec<_>>();
        Self {
            displacement: scale(&self.displacement),
            velocity: scale(&self.velocity),
            acceleration: scale(&self.acceleration),
            jerk: scale(&self.jerk),
        }
    }
}

/// Raw and smoothed kinematic curves derived from a displacement series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicSeries {
    /// Time grid, in seconds.
    pub time: Vec<f64>,
    /// Finite-difference chain of the raw displacement.
    pub raw: KinematicCurves,
    /// Gaussian-smoothed copy of each raw curve.
    pub smoothed: KinematicCurves,
    /// Odd window size actually used for smoothing.
    pub smoothing_window: usize,
}

impl KinematicSeries {
    /// Differentiate a displacement series three times and smooth every curve.
    ///
    /// The derivative chain runs on the raw curves: velocity from the raw
    /// displacement, acceleration from the raw velocity, jerk from the raw
    /// acceleration. The smoothed curves are smoothed copies of each raw one.
    ///
    /// # Arguments
    ///
    /// * `time` - The strictly increasing time grid.
    /// * `displacement` - The displacement magnitudes.
    /// * `smoothing_window` - The gaussian window size, bumped to odd.
    pub fn compute(
        time: &[f64],
        displacement: &[f64],
        smoothing_window: usize,
    ) -> Result<Self, ScaleError> {
        ensure_finite("displacement", displacement)?;

        let velocity = gradient(displacement, time)?;
        let acceleration = gradient(&velocity, time)?;
        let jerk = gradient(&acceleration, time)?;

        let raw = KinematicCurves {
            displacement: displacement.to_vec(),
            velocity,
            acceleration,
            jerk,
        };

        let smoothed = KinematicCurves {
            displacement: kernels::gaussian_smooth(&raw.displacement, smoothing_window)?,
            velocity: kernels::gaussian_smooth(&raw.velocity, smoothing_window)?,
            acceleration: kernels::gaussian_smooth(&raw.acceleration, smoothing_window)?,
            jerk: kernels::gaussian_smooth(&raw.jerk, smoothing_window)?,
        };

        log::debug!(
            "computed kinematics over {} samples, smoothing window {}",
            time.len(),
            kernels::odd_window(smoothing_window)
        );

        Ok(Self {
            time: time.to_vec(),
            raw,
            smoothed,
            smoothing_window: kernels::odd_window(smoothing_window),
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether the series holds no samples.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gradient_non_uniform() -> Result<(), ScaleError> {
        let times = [0.0, 1.0, 3.0, 4.0];
        let values = [0.0, 2.0, 6.0, 8.0];
        let d = gradient(&values, &times)?;
        for v in d {
            assert_relative_eq!(v, 2.0, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_gradient_errors() {
        assert!(matches!(
            gradient(&[1.0], &[0.0]),
            Err(ScaleError::InsufficientFrames { actual: 1, .. })
        ));
        assert!(matches!(
            gradient(&[1.0, 2.0], &[0.0]),
            Err(ScaleError::LengthMismatch { .. })
        ));
        assert!(matches!(
            gradient(&[1.0, 2.0, 3.0], &[0.0, 1.0, 1.0]),
            Err(ScaleError::NonMonotonicTime { index: 2, .. })
        ));
        assert!(matches!(
            gradient(&[1.0, f64::NAN, 3.0], &[0.0, 1.0, 2.0]),
            Err(ScaleError::NonFiniteResult { .. })
        ));
    }

    fn max_interior_error(
        dt: f64,
        position: impl Fn(f64) -> f64,
        accel: impl Fn(f64) -> f64,
    ) -> Result<f64, ScaleError> {
        let n = (1.0 / dt).round() as usize + 1;
        let time = (0..n).map(|i| i as f64 * dt).collect::<Vec<_>>();
        let disp = time.iter().map(|&t| position(t)).collect::<Vec<_>>();
        let series = KinematicSeries::compute(&time, &disp, 5)?;
        // the first two and last two samples involve one-sided differences
        Ok((2..n - 2)
            .map(|i| (series.raw.acceleration[i] - accel(time[i])).abs())
            .fold(0.0, f64::max))
    }

    #[test]
    fn test_constant_acceleration_recovered() -> Result<(), ScaleError> {
        let a = 3.7;
        for dt in [1.0 / 60.0, 1.0 / 240.0] {
            let err = max_interior_error(dt, |t| 0.5 * a * t * t, |_| a)?;
            assert!(err < 1e-6, "dt {dt}: error {err}");
        }
        Ok(())
    }

    #[test]
    fn test_discretization_error_shrinks() -> Result<(), ScaleError> {
        let coarse = max_interior_error(1.0 / 30.0, f64::sin, |t| -t.sin())?;
        let fine = max_interior_error(1.0 / 240.0, f64::sin, |t| -t.sin())?;
        assert!(fine < coarse / 10.0, "fine {fine} coarse {coarse}");
        assert!(fine < 1e-4);
        Ok(())
    }

    #[test]
    fn test_kinematic_series_lengths() -> Result<(), ScaleError> {
        let time = (0..10).map(|i| i as f64 * 0.1).collect::<Vec<_>>();
        let disp = time.iter().map(|t| t * t).collect::<Vec<_>>();
        let series = KinematicSeries::compute(&time, &disp, 4)?;
        assert_eq!(series.smoothing_window, 5);
        for curve in [&series.raw, &series.smoothed] {
            assert_eq!(curve.displacement.len(), 10);
            assert_eq!(curve.velocity.len(), 10);
            assert_eq!(curve.acceleration.len(), 10);
            assert_eq!(curve.jerk.len(), 10);
        }
        Ok(())
    }

    #[test]
    fn test_kinematic_series_window_too_large() {
        let time = [0.0, 0.1, 0.2];
        let disp = [0.0, 0.1, 0.4];
        assert!(matches!(
            KinematicSeries::compute(&time, &disp, 5),
            Err(ScaleError::InsufficientFrames {
                stage: "gaussian smoothing",
                ..
            })
        ));
    }
}

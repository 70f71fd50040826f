use faer::prelude::SpSolverLstsq;
use serde::{Deserialize, Serialize};

use crate::{
    config::{ScaleConfig, ScaleMethod},
    error::{ensure_finite, ScaleError},
};

/// Parameters of the kinematic model `s(t) = u t - 0.5 g t^2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    /// Initial velocity, reconstruction units per second.
    pub u: f64,
    /// Estimated deceleration, reconstruction units per second squared.
    pub g_est: f64,
    /// `u` multiplied by the scale factor, m/s.
    pub u_scaled: f64,
    /// `g_est` multiplied by the scale factor, m/s^2.
    pub g_scaled: f64,
}

impl FitParams {
    /// Evaluate the model at `t`, in reconstruction units.
    pub fn displacement_at(&self, t: f64) -> f64 {
        self.u * t - 0.5 * self.g_est * t * t
    }
}

/// Residuals between the scaled displacement and the scaled model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    /// Mean absolute error, meters.
    pub mae: f64,
    /// Root mean squared error, meters.
    pub rmse: f64,
    /// Largest absolute error, meters.
    pub max_abs: f64,
}

/// Recovered scale factor and its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleEstimate {
    /// Algorithm that produced the estimate.
    pub method: ScaleMethod,
    /// Multiplier from reconstruction units to meters.
    pub scale_factor: f64,
    /// Model parameters, least squares only.
    pub fit_params: Option<FitParams>,
    /// Fit residuals, least squares only.
    pub residual_stats: Option<ResidualStats>,
    /// Mean-ratio scale computed from the raw acceleration, mean ratio only.
    ///
    /// `None` when the raw mean is degenerate.
    pub raw_scale_factor: Option<f64>,
    /// Number of samples the estimator consumed.
    pub num_samples: usize,
}

/// Series handed to a scale solver.
///
/// `time` and `displacement` must be referenced to the first sample, so
/// `displacement[0]` is zero at `time[0] == 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitInput<'a> {
    /// Time grid, seconds.
    pub time: &'a [f64],
    /// Displacement magnitude, reconstruction units.
    pub displacement: &'a [f64],
    /// Smoothed acceleration, reconstruction units per second squared.
    pub acceleration: &'a [f64],
    /// Raw acceleration over the same samples. May be empty.
    pub raw_acceleration: &'a [f64],
    /// Whether `acceleration` was filtered down to decelerating samples.
    ///
    /// The ratio is then taken against the mean deceleration `-mean`, the
    /// same sign convention as `g_est` in `s(t) = u t - 0.5 g t^2`.
    pub decelerating: bool,
}

/// Trait for scale solvers.
pub trait ScaleSolver {
    /// Method tag recorded in the estimate.
    fn method(&self) -> ScaleMethod;

    /// Recover the scale factor that maps `input` onto `gravity_reference`.
    fn solve(
        &self,
        input: &FitInput<'_>,
        gravity_reference: f64,
    ) -> Result<ScaleEstimate, ScaleError>;
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |m: f64, v| m.max(v.abs()))
}

/// `scale = g_known / mean(acceleration)`, or `g_known / -mean(acceleration)`
/// for an input filtered down to decelerating samples.
///
/// Only meaningful when the series is dominated by vertical free fall.
#[derive(Debug, Clone, Copy)]
pub struct MeanRatio {
    /// Relative threshold below which the mean counts as zero.
    pub tolerance: f64,
}

impl MeanRatio {
    /// Mean of `acceleration`, negated for decelerating input.
    fn reference_mean(&self, acceleration: &[f64], decelerating: bool) -> Result<f64, ScaleError> {
        ensure_finite("mean ratio acceleration", acceleration)?;

        let mean = acceleration.iter().sum::<f64>() / acceleration.len() as f64;
        let mean = match decelerating {
            true => -mean,
            false => mean,
        };
        if !mean.is_finite() || mean == 0.0 || mean.abs() <= self.tolerance * max_abs(acceleration)
        {
            return Err(ScaleError::DegenerateFit {
                stage: "mean ratio",
                value: mean,
            });
        }
        Ok(mean)
    }
}

impl ScaleSolver for MeanRatio {
    fn method(&self) -> ScaleMethod {
        ScaleMethod::MeanRatio
    }

    fn solve(
        &self,
        input: &FitInput<'_>,
        gravity_reference: f64,
    ) -> Result<ScaleEstimate, ScaleError> {
        let acceleration = input.acceleration;
        if acceleration.is_empty() {
            return Err(ScaleError::InsufficientFrames {
                stage: "mean ratio",
                required: 1,
                actual: 0,
            });
        }
        let mean = self.reference_mean(acceleration, input.decelerating)?;
        let scale_factor = gravity_reference / mean;

        let raw_scale_factor = match input.raw_acceleration.is_empty() {
            true => None,
            false => self
                .reference_mean(input.raw_acceleration, input.decelerating)
                .ok()
                .map(|raw_mean| gravity_reference / raw_mean),
        };

        log::debug!(
            "mean ratio: mean acceleration {mean}, scale {scale_factor}, raw scale {raw_scale_factor:?}"
        );

        Ok(ScaleEstimate {
            method: self.method(),
            scale_factor,
            fit_params: None,
            residual_stats: None,
            raw_scale_factor,
            num_samples: acceleration.len(),
        })
    }
}

/// Least-squares fit of `s(t) = u t - 0.5 g t^2` to the displacement.
///
/// The sample at `t = 0` is left out of the system since its row is zero.
#[derive(Debug, Clone, Copy)]
pub struct LeastSquaresFit {
    /// Relative threshold below which the quadratic term counts as zero.
    pub tolerance: f64,
}

impl LeastSquaresFit {
    /// Solve for `(u, g_est)`.
    fn fit(&self, time: &[f64], displacement: &[f64]) -> (f64, f64) {
        let num_rows = time.len() - 1;

        // construct the system: [t, -0.5 t^2] [u, g]^T = s
        let mat_a = faer::Mat::<f64>::from_fn(num_rows, 2, |i, j| {
            let t = time[i + 1];
            match j {
                0 => t,
                _ => -0.5 * t * t,
            }
        });
        let mat_b = faer::Mat::<f64>::from_fn(num_rows, 1, |i, _| displacement[i + 1]);

        let params = mat_a.qr().solve_lstsq(mat_b);
        let x = params.col(0);
        (x[0], x[1])
    }
}

impl ScaleSolver for LeastSquaresFit {
    fn method(&self) -> ScaleMethod {
        ScaleMethod::LeastSquares
    }

    fn solve(
        &self,
        input: &FitInput<'_>,
        gravity_reference: f64,
    ) -> Result<ScaleEstimate, ScaleError> {
        let (time, displacement) = (input.time, input.displacement);
        if time.len() != displacement.len() {
            return Err(ScaleError::LengthMismatch {
                stage: "least squares",
                left_name: "time",
                left_len: time.len(),
                right_name: "displacement",
                right_len: displacement.len(),
            });
        }
        // the t = 0 sample does not count
        if time.len() < 3 {
            return Err(ScaleError::InsufficientFrames {
                stage: "least squares",
                required: 3,
                actual: time.len(),
            });
        }
        ensure_finite("least squares time", time)?;
        ensure_finite("least squares displacement", displacement)?;

        let (u, g_est) = self.fit(time, displacement);

        let t_max = max_abs(time);
        let quadratic = 0.5 * g_est.abs() * t_max * t_max;
        if !g_est.is_finite()
            || g_est == 0.0
            || quadratic <= self.tolerance * max_abs(displacement)
        {
            return Err(ScaleError::DegenerateFit {
                stage: "least squares",
                value: g_est,
            });
        }
        if !u.is_finite() {
            return Err(ScaleError::NonFiniteResult {
                stage: "least squares initial velocity",
                index: 0,
                value: u,
            });
        }

        let scale_factor = gravity_reference / g_est;
        let fit_params = FitParams {
            u,
            g_est,
            u_scaled: u * scale_factor,
            g_scaled: g_est * scale_factor,
        };

        let errors = time
            .iter()
            .zip(displacement.iter())
            .map(|(&t, &s)| ((fit_params.displacement_at(t) - s) * scale_factor).abs())
            .collect::<Vec<_>>();
        let n = errors.len() as f64;
        let residual_stats = ResidualStats {
            mae: errors.iter().sum::<f64>() / n,
            rmse: (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt(),
            max_abs: max_abs(&errors),
        };

        log::debug!(
            "least squares: u = {u}, g_est = {g_est}, scale = {scale_factor}, rmse = {}",
            residual_stats.rmse
        );

        Ok(ScaleEstimate {
            method: self.method(),
            scale_factor,
            fit_params: Some(fit_params),
            residual_stats: Some(residual_stats),
            raw_scale_factor: None,
            num_samples: time.len() - 1,
        })
    }
}

/// Build the solver selected by `config`.
pub fn scale_solver(config: &ScaleConfig) -> Box<dyn ScaleSolver> {
    match config.scale_method {
        ScaleMethod::MeanRatio => Box::new(MeanRatio {
            tolerance: config.degenerate_tolerance,
        }),
        ScaleMethod::LeastSquares => Box::new(LeastSquaresFit {
            tolerance: config.degenerate_tolerance,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOL: f64 = 1e-9;

    fn synthetic(n: usize, dt: f64, u: f64, g: f64) -> (Vec<f64>, Vec<f64>) {
        let time = (0..n).map(|i| i as f64 * dt).collect::<Vec<_>>();
        let disp = time.iter().map(|t| u * t - 0.5 * g * t * t).collect();
        (time, disp)
    }

    #[test]
    fn test_least_squares_concrete_scenario() -> Result<(), ScaleError> {
        let (time, disp) = synthetic(100, 1.0 / 240.0, 0.5, 0.0817);
        let input = FitInput {
            time: &time,
            displacement: &disp,
            ..Default::default()
        };
        let estimate = LeastSquaresFit { tolerance: TOL }.solve(&input, 9.8)?;

        assert_eq!(estimate.method, ScaleMethod::LeastSquares);
        assert_eq!(estimate.num_samples, 99);
        assert_relative_eq!(estimate.scale_factor, 9.8 / 0.0817, max_relative = 1e-3);
        assert_relative_eq!(estimate.scale_factor, 119.95, max_relative = 1e-3);

        let params = estimate.fit_params.expect("least squares reports fit params");
        assert_relative_eq!(params.u, 0.5, max_relative = 1e-6);
        assert_relative_eq!(params.g_scaled, 9.8, max_relative = 1e-9);

        let stats = estimate
            .residual_stats
            .expect("least squares reports residuals");
        assert!(stats.mae < 1e-9);
        assert!(stats.rmse < 1e-9);
        Ok(())
    }

    #[test]
    fn test_least_squares_linear_is_degenerate() {
        let (time, disp) = synthetic(50, 0.01, 1.3, 0.0);
        let input = FitInput {
            time: &time,
            displacement: &disp,
            ..Default::default()
        };
        assert!(matches!(
            LeastSquaresFit { tolerance: TOL }.solve(&input, 9.8),
            Err(ScaleError::DegenerateFit {
                stage: "least squares",
                ..
            })
        ));
    }

    #[test]
    fn test_least_squares_static_is_degenerate() {
        let time = [0.0, 0.1, 0.2, 0.3];
        let disp = [0.0; 4];
        let input = FitInput {
            time: &time,
            displacement: &disp,
            ..Default::default()
        };
        assert!(matches!(
            LeastSquaresFit { tolerance: TOL }.solve(&input, 9.8),
            Err(ScaleError::DegenerateFit { .. })
        ));
    }

    #[test]
    fn test_least_squares_two_samples() {
        let time = [0.0, 0.1];
        let disp = [0.0, 0.2];
        let input = FitInput {
            time: &time,
            displacement: &disp,
            ..Default::default()
        };
        assert_eq!(
            LeastSquaresFit { tolerance: TOL }.solve(&input, 9.8),
            Err(ScaleError::InsufficientFrames {
                stage: "least squares",
                required: 3,
                actual: 2,
            })
        );
    }

    #[test]
    fn test_mean_ratio() -> Result<(), ScaleError> {
        let acceleration = [0.5, 0.3, 0.4];
        let input = FitInput {
            acceleration: &acceleration,
            ..Default::default()
        };
        let estimate = MeanRatio { tolerance: TOL }.solve(&input, 9.8)?;
        assert_eq!(estimate.method, ScaleMethod::MeanRatio);
        assert_relative_eq!(estimate.scale_factor, 24.5, epsilon = 1e-12);
        assert!(estimate.fit_params.is_none());
        assert!(estimate.residual_stats.is_none());
        assert!(estimate.raw_scale_factor.is_none());
        Ok(())
    }

    #[test]
    fn test_mean_ratio_decelerating() -> Result<(), ScaleError> {
        let acceleration = [-0.5, -0.3, -0.4];
        let raw_acceleration = [-0.45, -0.35];
        let input = FitInput {
            acceleration: &acceleration,
            raw_acceleration: &raw_acceleration,
            decelerating: true,
            ..Default::default()
        };
        let estimate = MeanRatio { tolerance: TOL }.solve(&input, 9.8)?;
        assert_relative_eq!(estimate.scale_factor, 24.5, epsilon = 1e-12);
        let raw_scale = estimate.raw_scale_factor.expect("raw acceleration is given");
        assert_relative_eq!(raw_scale, 24.5, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_mean_ratio_degenerate_raw_is_dropped() -> Result<(), ScaleError> {
        let acceleration = [0.5, 0.3, 0.4];
        let raw_acceleration = [0.5, -0.5];
        let input = FitInput {
            acceleration: &acceleration,
            raw_acceleration: &raw_acceleration,
            ..Default::default()
        };
        let estimate = MeanRatio { tolerance: TOL }.solve(&input, 9.8)?;
        assert_relative_eq!(estimate.scale_factor, 24.5, epsilon = 1e-12);
        assert!(estimate.raw_scale_factor.is_none());
        Ok(())
    }

    #[test]
    fn test_mean_ratio_degenerate() {
        let acceleration = [1.0, -1.0, 0.0];
        let input = FitInput {
            acceleration: &acceleration,
            ..Default::default()
        };
        assert_eq!(
            MeanRatio { tolerance: TOL }.solve(&input, 9.8),
            Err(ScaleError::DegenerateFit {
                stage: "mean ratio",
                value: 0.0,
            })
        );

        let input = FitInput::default();
        assert!(matches!(
            MeanRatio { tolerance: TOL }.solve(&input, 9.8),
            Err(ScaleError::InsufficientFrames { .. })
        ));
    }

    #[test]
    fn test_scale_solver_dispatch() {
        let config = ScaleConfig {
            scale_method: ScaleMethod::MeanRatio,
            ..Default::default()
        };
        assert_eq!(scale_solver(&config).method(), ScaleMethod::MeanRatio);
        assert_eq!(
            scale_solver(&ScaleConfig::default()).method(),
            ScaleMethod::LeastSquares
        );
    }
}

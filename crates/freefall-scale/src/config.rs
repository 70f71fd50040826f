use serde::{Deserialize, Serialize};

use crate::error::ScaleError;

/// Estimation algorithm used to recover the scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMethod {
    /// `g_known / mean(acceleration)`.
    MeanRatio,
    /// Least-squares fit of `s(t) = u t - 0.5 g t^2`.
    LeastSquares,
}

impl std::str::FromStr for ScaleMethod {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean_ratio" => Ok(Self::MeanRatio),
            "least_squares" => Ok(Self::LeastSquares),
            _ => Err(ScaleError::InvalidConfig(format!(
                "unknown scale method '{s}', expected mean_ratio or least_squares"
            ))),
        }
    }
}

impl std::str::FromStr for PhaseIsolationKind {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sign_mask" => Ok(Self::SignMask),
            "longest_run" => Ok(Self::LongestRun),
            _ => Err(ScaleError::InvalidConfig(format!(
                "unknown phase isolation '{s}', expected sign_mask or longest_run"
            ))),
        }
    }
}

/// Strategy used to isolate the free-fall segment of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseIsolationKind {
    /// Keep positive velocity, then negative acceleration.
    SignMask,
    /// Keep the longest run of positive velocity, then negative acceleration.
    LongestRun,
}

/// Configuration of a scale recovery run.
///
/// The defaults reproduce a 240 fps capture with earth gravity and a
/// least-squares fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Time between consecutive frames, in seconds.
    pub frame_interval_seconds: f64,
    /// Known gravitational acceleration, in m/s^2.
    pub gravity_reference_m_s2: f64,
    /// Gaussian smoothing window in samples. Even values are bumped to the next odd one.
    pub smoothing_window: usize,
    /// Estimation algorithm.
    pub scale_method: ScaleMethod,
    /// Whether to isolate the free-fall phase before estimating.
    pub enable_phase_isolation: bool,
    /// Strategy used when `enable_phase_isolation` is set.
    pub phase_isolation: PhaseIsolationKind,
    /// Relative threshold below which an estimated acceleration counts as zero.
    pub degenerate_tolerance: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            frame_interval_seconds: 1.0 / 240.0,
            gravity_reference_m_s2: 9.8,
            smoothing_window: 5,
            scale_method: ScaleMethod::LeastSquares,
            enable_phase_isolation: false,
            phase_isolation: PhaseIsolationKind::SignMask,
            degenerate_tolerance: 1e-9,
        }
    }
}

impl ScaleConfig {
    /// Check that every field holds a usable value.
    pub fn validate(&self) -> Result<(), ScaleError> {
        if !(self.frame_interval_seconds.is_finite() && self.frame_interval_seconds > 0.0) {
            return Err(ScaleError::InvalidConfig(format!(
                "frame_interval_seconds must be positive and finite, got {}",
                self.frame_interval_seconds
            )));
        }
        if !(self.gravity_reference_m_s2.is_finite() && self.gravity_reference_m_s2 != 0.0) {
            return Err(ScaleError::InvalidConfig(format!(
                "gravity_reference_m_s2 must be non-zero and finite, got {}",
                self.gravity_reference_m_s2
            )));
        }
        if self.smoothing_window == 0 {
            return Err(ScaleError::InvalidConfig(
                "smoothing_window must be at least 1".to_string(),
            ));
        }
        if !(self.degenerate_tolerance.is_finite() && self.degenerate_tolerance >= 0.0) {
            return Err(ScaleError::InvalidConfig(format!(
                "degenerate_tolerance must be non-negative and finite, got {}",
                self.degenerate_tolerance
            )));
        }
        Ok(())
    }
}

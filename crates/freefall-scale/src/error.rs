use thiserror::Error;

/// Error types for the scale recovery pipeline.
///
/// Every variant is terminal for the trajectory being processed. The
/// computation is deterministic, so none of them is worth retrying.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    /// Not enough samples for the requested operation.
    #[error("{stage} requires at least {required} samples, got {actual}")]
    InsufficientFrames {
        /// Pipeline stage that rejected the input.
        stage: &'static str,
        /// Minimum number of samples required.
        required: usize,
        /// Number of samples provided.
        actual: usize,
    },

    /// Two pose records share the same identifier.
    #[error("duplicate pose identifier '{identifier}'")]
    DuplicatePose {
        /// The repeated identifier.
        identifier: String,
    },

    /// A pose quaternion is non-finite or has zero norm.
    #[error("invalid quaternion {quaternion:?} for pose '{identifier}'")]
    InvalidQuaternion {
        /// Identifier of the offending pose.
        identifier: String,
        /// The quaternion as read, `(w, x, y, z)`.
        quaternion: [f64; 4],
    },

    /// The estimated gravity (or mean acceleration) is zero or non-finite.
    #[error("degenerate fit in {stage}: estimated acceleration {value}")]
    DegenerateFit {
        /// Estimator that produced the value.
        stage: &'static str,
        /// The offending acceleration estimate.
        value: f64,
    },

    /// A phase isolation strategy retained no samples.
    #[error("phase isolation '{strategy}' retained no samples after {step}")]
    EmptyFilteredSeries {
        /// Name of the isolation strategy.
        strategy: &'static str,
        /// Filtering step that emptied the series.
        step: &'static str,
    },

    /// A NaN or infinity surfaced in a computed series.
    #[error("non-finite value {value} in {stage} at index {index}")]
    NonFiniteResult {
        /// Series or stage where the value appeared.
        stage: &'static str,
        /// Sample index of the value.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// Two parallel series have different lengths.
    #[error("mismatched lengths in {stage}: {left_name} ({left_len}) != {right_name} ({right_len})")]
    LengthMismatch {
        /// Stage that compared the series.
        stage: &'static str,
        /// Label for the left-hand series.
        left_name: &'static str,
        /// Length of the left-hand series.
        left_len: usize,
        /// Label for the right-hand series.
        right_name: &'static str,
        /// Length of the right-hand series.
        right_len: usize,
    },

    /// The time grid is not strictly increasing.
    #[error("time grid not strictly increasing at index {index}: {previous} -> {current}")]
    NonMonotonicTime {
        /// Index of the first sample that does not advance.
        index: usize,
        /// Timestamp before `index`.
        previous: f64,
        /// Timestamp at `index`.
        current: f64,
    },

    /// The configuration holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Check that every value in `values` is finite.
pub(crate) fn ensure_finite(stage: &'static str, values: &[f64]) -> Result<(), ScaleError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ScaleError::NonFiniteResult {
            stage,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

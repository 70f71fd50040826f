#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Run configuration.
pub mod config;

/// Finite-difference derivatives and kinematic curves.
pub mod differentiate;

/// Error types for the pipeline.
pub mod error;

/// Scale solvers and their diagnostics.
pub mod estimate;

/// Gaussian smoothing kernels.
pub mod kernels;

/// Natural ordering of frame identifiers.
pub mod natural;

/// Isolation of the free-fall segment of a recording.
pub mod phase;

/// End-to-end scale recovery.
pub mod pipeline;

/// Pose records and the quaternion convention.
pub mod pose;

/// Result packaging.
pub mod result;

/// Camera trajectories built from poses.
pub mod trajectory;

pub use config::{PhaseIsolationKind, ScaleConfig, ScaleMethod};
pub use error::ScaleError;
pub use estimate::{FitParams, ResidualStats, ScaleEstimate};
pub use pipeline::estimate_scale;
pub use pose::PoseRecord;
pub use result::AssembledOutput;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{error::ScaleError, natural, pose::PoseRecord};

/// A camera position sampled at one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    /// Index of the frame in natural order.
    pub frame_index: usize,
    /// `frame_index * dt`, in seconds.
    pub timestamp: f64,
    /// Camera center in world coordinates.
    pub position: [f64; 3],
    /// Position relative to the first frame.
    pub displacement: [f64; 3],
    /// Euclidean norm of `displacement`.
    pub displacement_magnitude: f64,
}

/// An ordered camera trajectory in reconstruction units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Frame identifiers, in the order of `samples`.
    pub identifiers: Vec<String>,
    /// One sample per pose.
    pub samples: Vec<TrajectorySample>,
}

impl Trajectory {
    /// Build a trajectory from pose records.
    ///
    /// The records are sorted by the natural order of their identifiers
    /// first; already sorted input keeps its order.
    ///
    /// # Arguments
    ///
    /// * `poses` - The pose records, one per frame.
    /// * `dt` - The frame interval in seconds.
    ///
    /// # Errors
    ///
    /// `InsufficientFrames` for fewer than 2 records, `DuplicatePose` for a
    /// repeated identifier and `InvalidQuaternion` for a malformed rotation.
    pub fn from_poses(poses: &[PoseRecord], dt: f64) -> Result<Self, ScaleError> {
        if poses.len() < 2 {
            return Err(ScaleError::InsufficientFrames {
                stage: "trajectory",
                required: 2,
                actual: poses.len(),
            });
        }

        let mut sorted = poses.iter().collect::<Vec<_>>();
        natural::natural_sort_by_key(&mut sorted, |p| p.identifier.as_str());

        let mut seen = HashSet::with_capacity(sorted.len());
        for pose in sorted.iter() {
            if !seen.insert(pose.identifier.as_str()) {
                return Err(ScaleError::DuplicatePose {
                    identifier: pose.identifier.clone(),
                });
            }
            pose.validate()?;
        }

        let positions = sorted
            .iter()
            .map(|pose| pose.camera_center())
            .collect::<Vec<_>>();
        let origin = positions[0];

        let samples = positions
            .into_iter()
            .enumerate()
            .map(|(frame_index, position)| {
                let displacement = [
                    position[0] - origin[0],
                    position[1] - origin[1],
                    position[2] - origin[2],
                ];
                let displacement_magnitude = (displacement[0] * displacement[0]
                    + displacement[1] * displacement[1]
                    + displacement[2] * displacement[2])
                    .sqrt();
                TrajectorySample {
                    frame_index,
                    timestamp: frame_index as f64 * dt,
                    position,
                    displacement,
                    displacement_magnitude,
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "built trajectory with {} samples from '{}' to '{}'",
            samples.len(),
            sorted[0].identifier,
            sorted[sorted.len() - 1].identifier
        );

        Ok(Self {
            identifiers: sorted.iter().map(|p| p.identifier.clone()).collect(),
            samples,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the trajectory holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample timestamps.
    pub fn timestamps(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    /// Displacement magnitudes relative to the first frame.
    pub fn displacement_magnitudes(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.displacement_magnitude).collect()
    }

    /// World positions.
    pub fn positions(&self) -> Vec<[f64; 3]> {
        self.samples.iter().map(|s| s.position).collect()
    }

    /// Displacement vectors relative to the first frame.
    pub fn displacements(&self) -> Vec<[f64; 3]> {
        self.samples.iter().map(|s| s.displacement).collect()
    }
}

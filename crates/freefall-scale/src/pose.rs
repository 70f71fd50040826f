use serde::{Deserialize, Serialize};

use crate::error::ScaleError;

/// One frame's camera pose in reconstruction units.
///
/// The rotation maps coordinates from the **world** frame to the **camera**
/// frame and the translation is the matching world-to-camera offset, so a
/// world point `X` lands at `R X + t` in the camera frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    /// Frame identifier, usually the image file name.
    pub identifier: String,
    /// Rotation quaternion `(w, x, y, z)`. Expected to be unit norm.
    pub quaternion: [f64; 4],
    /// Translation `(x, y, z)`.
    pub translation: [f64; 3],
}

impl PoseRecord {
    /// Create a new pose record.
    pub fn new(identifier: impl Into<String>, quaternion: [f64; 4], translation: [f64; 3]) -> Self {
        Self {
            identifier: identifier.into(),
            quaternion,
            translation,
        }
    }

    /// Check the quaternion and translation for non-finite or zero-norm values.
    ///
    /// The quaternion is not re-normalized.
    pub fn validate(&self) -> Result<(), ScaleError> {
        let norm_sq = self.quaternion.iter().map(|q| q * q).sum::<f64>();
        if !norm_sq.is_finite() || norm_sq < 1e-20 {
            return Err(ScaleError::InvalidQuaternion {
                identifier: self.identifier.clone(),
                quaternion: self.quaternion,
            });
        }
        if let Some(index) = self.translation.iter().position(|t| !t.is_finite()) {
            return Err(ScaleError::NonFiniteResult {
                stage: "pose translation",
                index,
                value: self.translation[index],
            });
        }
        Ok(())
    }

    /// Rotation matrix of the pose, row major.
    pub fn rotation_matrix(&self) -> [[f64; 3]; 3] {
        quaternion_to_rotation_matrix(&self.quaternion)
    }

    /// Camera center in world coordinates, `C = -R^T t`.
    pub fn camera_center(&self) -> [f64; 3] {
        let r = self.rotation_matrix();
        let t = &self.translation;
        let mut center = [0.0; 3];
        for (j, c) in center.iter_mut().enumerate() {
            *c = -(r[0][j] * t[0] + r[1][j] * t[1] + r[2][j] * t[2]);
        }
        center
    }
}

/// Compute the rotation matrix from a `(w, x, y, z)` quaternion.
///
/// PRECONDITION: the quaternion is unit norm. A non-unit quaternion yields
/// a scaled, non-orthonormal matrix.
///
/// Example:
///
/// ```
/// use freefall_scale::pose::quaternion_to_rotation_matrix;
///
/// let rotation = quaternion_to_rotation_matrix(&[1.0, 0.0, 0.0, 0.0]);
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
/// ```
pub fn quaternion_to_rotation_matrix(q: &[f64; 4]) -> [[f64; 3]; 3] {
    let [w, x, y, z] = *q;

    let m00 = 1.0 - 2.0 * y * y - 2.0 * z * z;
    let m01 = 2.0 * x * y - 2.0 * w * z;
    let m02 = 2.0 * z * x + 2.0 * w * y;

    let m10 = 2.0 * x * y + 2.0 * w * z;
    let m11 = 1.0 - 2.0 * x * x - 2.0 * z * z;
    let m12 = 2.0 * y * z - 2.0 * w * x;

    let m20 = 2.0 * z * x - 2.0 * w * y;
    let m21 = 2.0 * y * z + 2.0 * w * x;
    let m22 = 1.0 - 2.0 * x * x - 2.0 * y * y;

    [[m00, m01, m02], [m10, m11, m12], [m20, m21, m22]]
}

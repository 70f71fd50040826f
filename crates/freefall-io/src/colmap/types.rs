use freefall_scale::PoseRecord;

/// Represents a registered image in a COLMAP model.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    /// Image name
    pub name: String,
    /// Image id
    pub image_id: u32,
    /// Camera id
    pub camera_id: u32,
    /// Rotation
    pub rotation: [f64; 4], // qw, qx, qy, qz
    /// Translation
    pub translation: [f64; 3], // x, y, z
    /// Number of 2d observations
    pub num_points2d: usize,
}

impl From<ColmapImage> for PoseRecord {
    fn from(image: ColmapImage) -> Self {
        PoseRecord::new(image.name, image.rotation, image.translation)
    }
}

mod binary;
mod text;
mod types;

use std::path::Path;

pub use binary::read_images_bin;
use freefall_scale::{natural, PoseRecord, ScaleError};
pub use text::read_images_txt;
pub use types::ColmapImage;

/// Error types for the COLMAP module.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error {0}")]
    ParseError(String),

    /// The model directory holds neither images.bin nor images.txt
    #[error("no images.bin or images.txt in {0}")]
    MissingModel(String),

    /// A record failed validation
    #[error("invalid pose record '{name}'")]
    InvalidRecord {
        /// Image name of the record
        name: String,
        /// The validation failure
        #[source]
        source: ScaleError,
    },
}

/// Convert COLMAP images into validated pose records, in natural order of their names.
///
/// # Arguments
///
/// * `images` - The images read from a COLMAP model.
///
/// # Returns
///
/// One pose record per image.
pub fn images_to_poses(images: Vec<ColmapImage>) -> Result<Vec<PoseRecord>, ColmapError> {
    let mut poses = images
        .into_iter()
        .map(|image| {
            let pose = PoseRecord::from(image);
            match pose.validate() {
                Ok(()) => Ok(pose),
                Err(source) => Err(ColmapError::InvalidRecord {
                    name: pose.identifier.clone(),
                    source,
                }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    natural::natural_sort_by_key(&mut poses, |p| p.identifier.as_str());
    Ok(poses)
}

/// Read the poses of a COLMAP model directory.
///
/// Reads `images.bin` when present and falls back to `images.txt`.
///
/// # Arguments
///
/// * `model_dir` - The directory holding the sparse model.
///
/// # Returns
///
/// Validated pose records in natural order of their image names.
pub fn read_poses(model_dir: impl AsRef<Path>) -> Result<Vec<PoseRecord>, ColmapError> {
    let model_dir = model_dir.as_ref();
    let bin_path = model_dir.join("images.bin");
    let txt_path = model_dir.join("images.txt");

    let images = if bin_path.is_file() {
        log::debug!("reading {}", bin_path.display());
        read_images_bin(&bin_path)?
    } else if txt_path.is_file() {
        log::debug!("reading {}", txt_path.display());
        read_images_txt(&txt_path)?
    } else {
        return Err(ColmapError::MissingModel(model_dir.display().to_string()));
    };

    log::info!("read {} images from {}", images.len(), model_dir.display());
    images_to_poses(images)
}

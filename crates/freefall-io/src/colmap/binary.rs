use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use super::{ColmapError, ColmapImage};

// x, y as f64 and point3d_id as i64
const POINT2D_BYTES: usize = 24;

/// Read a little-endian u64
#[inline]
fn read_u64<R: Read>(reader: &mut R) -> Result<u64, ColmapError> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

/// Read a little-endian i32
#[inline]
fn read_i32<R: Read>(reader: &mut R) -> Result<i32, ColmapError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

/// Read a little-endian f64
#[inline]
fn read_f64<R: Read>(reader: &mut R) -> Result<f64, ColmapError> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(f64::from_le_bytes(bytes))
}

fn read_f64_array<R: Read, const N: usize>(reader: &mut R) -> Result<[f64; N], ColmapError> {
    let mut values = [0.0; N];
    for v in values.iter_mut() {
        *v = read_f64(reader)?;
    }
    Ok(values)
}

fn read_id<R: Read>(reader: &mut R, what: &str) -> Result<u32, ColmapError> {
    let id = read_i32(reader)?;
    u32::try_from(id).map_err(|_| ColmapError::ParseError(format!("Negative {} id: {}", what, id)))
}

/// Read a null-terminated name
fn read_name<R: BufRead>(reader: &mut R) -> Result<String, ColmapError> {
    let mut bytes = Vec::new();
    reader.read_until(0, &mut bytes)?;
    match bytes.pop() {
        Some(0) => String::from_utf8(bytes)
            .map_err(|e| ColmapError::ParseError(format!("Invalid image name: {}", e))),
        _ => Err(ColmapError::ParseError(
            "Unterminated image name".to_string(),
        )),
    }
}

fn read_image<R: BufRead>(reader: &mut R) -> Result<ColmapImage, ColmapError> {
    let image_id = read_id(reader, "image")?;
    let rotation = read_f64_array::<_, 4>(reader)?;
    let translation = read_f64_array::<_, 3>(reader)?;
    let camera_id = read_id(reader, "camera")?;
    let name = read_name(reader)?;

    // skip the 2d observations
    let num_points2d = read_u64(reader)?;
    let num_bytes = num_points2d
        .checked_mul(POINT2D_BYTES as u64)
        .ok_or_else(|| ColmapError::ParseError(format!("Too many points: {}", num_points2d)))?;
    let skipped = std::io::copy(&mut reader.by_ref().take(num_bytes), &mut std::io::sink())?;
    if skipped != num_bytes {
        return Err(ColmapError::ParseError(format!(
            "Truncated observations for image {}",
            name
        )));
    }

    Ok(ColmapImage {
        name,
        image_id,
        camera_id,
        rotation,
        translation,
        num_points2d: num_points2d as usize,
    })
}

/// Read the images.bin file and return a vector of ColmapImage structs.
///
/// # Arguments
///
/// * `path` - The path to the images.bin file.
///
/// # Returns
///
/// A vector of ColmapImage structs, in file order.
pub fn read_images_bin(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let num_images = read_u64(&mut reader)?;
    let images = (0..num_images)
        .map(|_| read_image(&mut reader))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(images)
}

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use super::{ColmapError, ColmapImage};

/// Read the images.txt file and return a vector of ColmapImage structs.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
///
/// # Returns
///
/// A vector of ColmapImage structs, in file order.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    // open the file and create a buffered reader
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    // drop the comment header; an image without observations has an empty second line
    let images = reader
        .lines()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|chunk| match chunk {
            [line1, line2] => parse_image_line(line1, line2),
            _ => Err(ColmapError::ParseError(
                "Invalid number of lines".to_string(),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(images)
}

/// Utility functions for parsing COLMAP text files
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::ParseError(format!("{}: {}", s, e)))
}

fn parse_array<const N: usize>(parts: &[&str], what: &str) -> Result<[f64; N], ColmapError> {
    parts
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| ColmapError::ParseError(format!("Invalid number of {} coordinates", what)))
}

/// Parse an image line and return a ColmapImage struct.
/// #   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
/// #   POINTS2D[] as (X, Y, POINT3D_ID)
fn parse_image_line(line1: &str, line2: &str) -> Result<ColmapImage, ColmapError> {
    // split the line into parts by whitespace
    let parts1 = line1.split_whitespace().collect::<Vec<_>>();
    let parts2 = line2.split_whitespace().collect::<Vec<_>>();

    if parts1.len() < 10 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts1.len()
        )));
    }
    if parts2.len() % 3 != 0 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of point2d parts: {}",
            parts2.len()
        )));
    }

    Ok(ColmapImage {
        image_id: parse_part(parts1[0])?,
        rotation: parse_array(&parts1[1..5], "rotation")?,
        translation: parse_array(&parts1[5..8], "translation")?,
        camera_id: parse_part(parts1[8])?,
        // names may contain spaces
        name: parts1[9..].join(" "),
        num_points2d: parts2.len() / 3,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_images_txt() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "# Image list with two lines of data per image:")?;
        writeln!(file, "#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME")?;
        writeln!(file, "#   POINTS2D[] as (X, Y, POINT3D_ID)")?;
        writeln!(file, "# Number of images: 2, mean observations per image: 1")?;
        writeln!(file, "1 1 0 0 0 0.5 -1.0 2.0 1 frame_10.jpg")?;
        writeln!(file, "10.5 20.25 7 3.0 4.0 -1")?;
        writeln!(file, "2 0.7071067811865476 0.7071067811865476 0 0 0 0 1 1 frame_2.jpg")?;
        writeln!(file)?;

        let images = read_images_txt(file.path())?;
        assert_eq!(images.len(), 2);

        assert_eq!(images[0].image_id, 1);
        assert_eq!(images[0].name, "frame_10.jpg");
        assert_eq!(images[0].rotation, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(images[0].translation, [0.5, -1.0, 2.0]);
        assert_eq!(images[0].num_points2d, 2);

        assert_eq!(images[1].name, "frame_2.jpg");
        assert_eq!(images[1].camera_id, 1);
        assert_eq!(images[1].num_points2d, 0);
        Ok(())
    }

    #[test]
    fn test_read_images_txt_malformed() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "1 1 0 0 zero 0.5 -1.0 2.0 1 frame_1.jpg")?;
        writeln!(file)?;
        assert!(matches!(
            read_images_txt(file.path()),
            Err(ColmapError::ParseError(_))
        ));

        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "1 1 0 0 0 0.5 -1.0 2.0 1 frame_1.jpg")?;
        assert!(matches!(
            read_images_txt(file.path()),
            Err(ColmapError::ParseError(_))
        ));
        Ok(())
    }
}

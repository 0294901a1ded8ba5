pub mod scanner;
pub mod selection;
pub mod storage;

use std::path::PathBuf;

use anyhow::Result;
use image::DynamicImage;
use rayon::prelude::*;
use tracing::error;

pub use selection::PhotoSelection;
pub use storage::{LoadedPhoto, PhotoStore};

/// Turns picked paths into in-memory images, the way the photo picker hands
/// them to a form. Undecodable files are logged and left out.
pub fn load_pending(paths: &[PathBuf]) -> Result<PhotoSelection<DynamicImage>> {
    let files = scanner::collect_images(paths)?;
    let decoded: Vec<(PathBuf, DynamicImage)> = files
        .into_par_iter()
        .filter_map(|path| match image::open(&path) {
            Ok(image) => Some((path, image)),
            Err(e) => {
                error!("Error loading image {:?}: {}", path, e);
                None
            }
        })
        .collect();

    let mut selection = PhotoSelection::default();
    for (path, image) in decoded {
        selection.push(path, image);
    }
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::fs;

    #[test]
    fn test_undecodable_files_are_dropped() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let good = tmp.path().join("good.png");
        DynamicImage::ImageRgb8(RgbImage::new(4, 4)).save_with_format(&good, ImageFormat::Png)?;

        // Valid signature and header, body cut off.
        let bytes = fs::read(&good)?;
        let broken = tmp.path().join("broken.png");
        fs::write(&broken, &bytes[..24])?;

        let selection = load_pending(&[broken, good.clone()])?;
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.picker_items, vec![good]);
        assert!(selection.selected_indexes.is_empty());
        Ok(())
    }
}

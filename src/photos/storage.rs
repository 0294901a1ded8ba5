use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::model::Store;

/// A stored photo resolved back to pixels.
#[derive(Debug, Clone)]
pub struct LoadedPhoto {
    pub file_name: String,
    pub image: DynamicImage,
}

/// Photos live as individual PNG files in the documents directory; stores only
/// keep the file names.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create documents directory {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Writes the image under a fresh `<UUID>.png` name and returns that name.
    pub fn save(&self, image: &DynamicImage) -> Result<String> {
        let file_name = format!("{}.png", Uuid::new_v4().to_string().to_uppercase());
        let path = self.path_for(&file_name);
        image
            .save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("Failed to write photo {:?}", path))?;
        debug!("Saved photo {}", file_name);
        Ok(file_name)
    }

    /// Saves every pending image and appends the written names to the store.
    /// Failed writes are logged and skipped. Returns the appended names.
    pub fn save_pending(&self, store: &mut Store, pending: &[DynamicImage]) -> Vec<String> {
        if pending.is_empty() {
            debug!("No new photos for '{}'", store.name);
            return Vec::new();
        }

        let saved: Vec<String> = pending
            .par_iter()
            .filter_map(|image| match self.save(image) {
                Ok(name) => Some(name),
                Err(e) => {
                    error!("Photo save failed: {:#}", e);
                    None
                }
            })
            .collect();

        store.file_names.extend(saved.iter().cloned());
        info!("Attached {} photo(s) to '{}'", saved.len(), store.name);
        saved
    }

    /// Resolves file names to images. Unreadable entries are dropped.
    pub fn load(&self, file_names: &[String]) -> Vec<LoadedPhoto> {
        file_names
            .par_iter()
            .filter(|name| !name.is_empty())
            .filter_map(|name| match image::open(self.path_for(name)) {
                Ok(image) => Some(LoadedPhoto {
                    file_name: name.clone(),
                    image,
                }),
                Err(e) => {
                    debug!("Photo {} unavailable: {}", name, e);
                    None
                }
            })
            .collect()
    }

    /// Best-effort removal; returns how many files were deleted.
    pub fn remove(&self, file_names: &[String]) -> usize {
        let mut removed = 0;
        for name in file_names.iter().filter(|n| !n.is_empty()) {
            match fs::remove_file(self.path_for(name)) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove photo {}: {}", name, e),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample_image(shade: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([shade, 0, 255 - shade])))
    }

    #[test]
    fn test_save_then_load() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let photos = PhotoStore::new(tmp.path().join("documents"))?;

        let name = photos.save(&sample_image(10))?;
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 36 + 4);
        assert_eq!(name, name.to_uppercase().replace(".PNG", ".png"));

        let loaded = photos.load(&[name.clone()]);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].file_name, name);
        assert_eq!(loaded[0].image.width(), 4);
        Ok(())
    }

    #[test]
    fn test_save_pending_appends_names() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let photos = PhotoStore::new(tmp.path())?;
        let mut store = Store::new("Sushi A");
        store.file_names = vec!["EXISTING.png".into()];

        let added = photos.save_pending(&mut store, &[sample_image(1), sample_image(2)]);
        assert_eq!(added.len(), 2);
        assert_eq!(store.file_names.len(), 3);
        assert_eq!(store.file_names[0], "EXISTING.png");
        assert_ne!(added[0], added[1]);
        Ok(())
    }

    #[test]
    fn test_save_pending_without_photos_is_noop() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let photos = PhotoStore::new(tmp.path())?;
        let mut store = Store::new("Ramen B");
        store.file_names = vec!["A.png".into(), "B.png".into()];
        let before = store.file_names.clone();

        assert!(photos.save_pending(&mut store, &[]).is_empty());
        assert_eq!(store.file_names, before);
        Ok(())
    }

    #[test]
    fn test_load_drops_missing_and_corrupt_files() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let photos = PhotoStore::new(tmp.path())?;
        let good = photos.save(&sample_image(50))?;
        fs::write(photos.path_for("BROKEN.png"), b"not a png")?;

        let names = vec![
            "MISSING.png".to_string(),
            good.clone(),
            String::new(),
            "BROKEN.png".to_string(),
        ];
        let loaded = photos.load(&names);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].file_name, good);
        Ok(())
    }

    #[test]
    fn test_remove_is_best_effort() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let photos = PhotoStore::new(tmp.path())?;
        let name = photos.save(&sample_image(3))?;
        assert_eq!(photos.remove(&[name.clone(), "NOPE.png".into()]), 1);
        assert!(!photos.path_for(&name).exists());
        Ok(())
    }
}

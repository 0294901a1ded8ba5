use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Expands picked paths into image files. Directories are walked (hidden
/// entries skipped, names sorted, links followed); anything that doesn't sniff
/// as `image/*` is ignored. Unreadable entries inside a walk are logged and
/// skipped, while an unreadable path given directly is an error.
pub fn collect_images(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for path in paths {
        if path.is_dir() {
            let walker = WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter();
            for entry in walker.filter_entry(|e| e.depth() == 0 || !is_hidden(e)) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Skipping unreadable entry under {:?}: {}", path, e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                match is_image(entry.path()) {
                    Ok(true) => images.push(entry.path().to_path_buf()),
                    Ok(false) => debug!("Skipping non-image {:?}", entry.path()),
                    Err(e) => warn!("Skipping {:?}: {:#}", entry.path(), e),
                }
            }
        } else if is_image(path)? {
            images.push(path.clone());
        } else {
            debug!("Skipping non-image {:?}", path);
        }
    }
    Ok(images)
}

pub fn detect_mimetype(path: &Path) -> Result<String> {
    let kind = infer::get_from_path(path)
        .with_context(|| format!("Failed to read {:?} for mimetype detection", path))?;

    match kind {
        Some(k) => Ok(k.mime_type().to_string()),
        None => Ok("application/octet-stream".to_string()),
    }
}

fn is_image(path: &Path) -> Result<bool> {
    Ok(detect_mimetype(path)?.starts_with("image/"))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

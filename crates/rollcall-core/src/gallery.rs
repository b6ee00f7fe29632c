//! Gallery bootstrap from a directory of labeled face images.
//!
//! File stem = identity label. Every directory entry is attempted; files
//! that fail to decode or yield no detectable face are skipped with a
//! warning rather than aborting the whole load.

use crate::extractor::FeatureExtractor;
use crate::types::GalleryEntry;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no usable faces in {0} — add images whose file stem is the identity label")]
    NoUsableFaces(PathBuf),
}

/// Build the gallery from a directory of labeled images.
///
/// Entries come back ordered by file name so match tie-breaking is
/// deterministic across runs. Duplicate stems keep the first file.
/// Zero usable entries is fatal: matching against an empty gallery would
/// just report every face as unknown forever.
pub fn load_gallery(
    dir: &Path,
    extractor: &FeatureExtractor,
) -> Result<Vec<GalleryEntry>, GalleryError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| GalleryError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut entries: Vec<GalleryEntry> = Vec::new();

    for path in paths {
        let Some(label) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned)
        else {
            tracing::warn!(path = %path.display(), "skipping file with unusable name");
            continue;
        };

        if entries.iter().any(|e| e.label == label) {
            tracing::warn!(label = %label, path = %path.display(), "duplicate label, keeping first file");
            continue;
        }

        let image = match image::open(&path) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable image");
                continue;
            }
        };

        match extractor.extract_image(&image) {
            Some(descriptor) => {
                tracing::debug!(label = %label, "gallery entry loaded");
                entries.push(GalleryEntry { label, descriptor });
            }
            None => {
                tracing::warn!(label = %label, path = %path.display(), "no detectable face, skipping");
            }
        }
    }

    if entries.is_empty() {
        return Err(GalleryError::NoUsableFaces(dir.to_path_buf()));
    }

    tracing::info!(entries = entries.len(), dir = %dir.display(), "gallery loaded");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::FaceLocator;
    use crate::types::FaceBounds;

    struct WholeRegionLocator;

    impl FaceLocator for WholeRegionLocator {
        fn locate(&self, _gray: &[u8], width: u32, height: u32) -> Vec<FaceBounds> {
            vec![FaceBounds {
                x: 0.0,
                y: 0.0,
                width: width as f32,
                height: height as f32,
                confidence: 1.0,
            }]
        }
    }

    struct NoFaceLocator;

    impl FaceLocator for NoFaceLocator {
        fn locate(&self, _gray: &[u8], _width: u32, _height: u32) -> Vec<FaceBounds> {
            Vec::new()
        }
    }

    fn whole_region_extractor() -> FeatureExtractor {
        FeatureExtractor::new(Box::new(WholeRegionLocator))
    }

    fn save_uniform(path: &Path, value: u8) {
        let img = image::GrayImage::from_pixel(32, 32, image::Luma([value]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_load_gallery_sorted_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        save_uniform(&dir.path().join("zoe.png"), 10);
        save_uniform(&dir.path().join("ana.png"), 200);

        let entries = load_gallery(dir.path(), &whole_region_extractor()).unwrap();
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["ana", "zoe"]);
    }

    #[test]
    fn test_load_gallery_skips_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("junk.png"), b"not an image").unwrap();
        save_uniform(&dir.path().join("ana.png"), 120);

        let entries = load_gallery(dir.path(), &whole_region_extractor()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "ana");
    }

    #[test]
    fn test_load_gallery_duplicate_stem_keeps_first() {
        let dir = tempfile::tempdir().unwrap();
        // bob.bmp sorts before bob.png; both are lossless formats.
        save_uniform(&dir.path().join("bob.bmp"), 10);
        save_uniform(&dir.path().join("bob.png"), 240);

        let entries = load_gallery(dir.path(), &whole_region_extractor()).unwrap();
        assert_eq!(entries.len(), 1);
        // All mass in bin 10 proves the first file won.
        assert!((entries[0].descriptor.values()[10] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_gallery_empty_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_gallery(dir.path(), &whole_region_extractor()).unwrap_err();
        assert!(matches!(err, GalleryError::NoUsableFaces(_)));
    }

    #[test]
    fn test_load_gallery_missing_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = load_gallery(&missing, &whole_region_extractor()).unwrap_err();
        assert!(matches!(err, GalleryError::ReadDir { .. }));
    }

    #[test]
    fn test_load_gallery_no_detectable_faces_errors() {
        let dir = tempfile::tempdir().unwrap();
        save_uniform(&dir.path().join("ana.png"), 120);

        let extractor = FeatureExtractor::new(Box::new(NoFaceLocator));
        let err = load_gallery(dir.path(), &extractor).unwrap_err();
        assert!(matches!(err, GalleryError::NoUsableFaces(_)));
    }
}

//! SeetaFace detection backend via the `rustface` crate.

use crate::locator::{FaceLocator, LocatorError};
use crate::types::FaceBounds;
use std::path::Path;

// --- Named constants (no magic numbers) ---
const MIN_FACE_SIZE: u32 = 20;
const SCORE_THRESHOLD: f64 = 2.0;
const PYRAMID_SCALE_FACTOR: f32 = 0.8;
const SLIDE_WINDOW_STEP: u32 = 4;

/// Face locator backed by the `rustface` crate (SeetaFace engine).
///
/// Holds the parsed model; a detector instance is built from a clone of it
/// per call because the underlying detector is stateful. Cloning the
/// locator shares nothing but the model bytes.
#[derive(Clone)]
pub struct RustfaceLocator {
    model: rustface::Model,
}

impl std::fmt::Debug for RustfaceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustfaceLocator").finish_non_exhaustive()
    }
}

impl RustfaceLocator {
    /// Load the SeetaFace model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, LocatorError> {
        if !model_path.exists() {
            return Err(LocatorError::ModelNotFound(model_path.to_path_buf()));
        }

        let data = std::fs::read(model_path).map_err(|e| LocatorError::ModelRead {
            path: model_path.to_path_buf(),
            source: e,
        })?;

        let model = rustface::read_model(std::io::Cursor::new(data)).map_err(|e| {
            LocatorError::ModelInvalid {
                path: model_path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        tracing::info!(path = %model_path.display(), "loaded SeetaFace detection model");

        Ok(Self { model })
    }
}

impl FaceLocator for RustfaceLocator {
    fn locate(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBounds> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
        detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

        let faces = detector.detect(&rustface::ImageData::new(gray, width, height));

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBounds {
                    x: bbox.x() as f32,
                    y: bbox.y() as f32,
                    width: bbox.width() as f32,
                    height: bbox.height() as f32,
                    confidence: face.score() as f32,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_model() {
        let err = RustfaceLocator::load(Path::new("/nonexistent/seeta.bin")).unwrap_err();
        assert!(matches!(err, LocatorError::ModelNotFound(_)));
        // The message carries the download hint for operators.
        assert!(err.to_string().contains("seeta_fd_frontal_v1.0.bin"));
    }
}

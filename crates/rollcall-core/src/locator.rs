//! Face localization seam.
//!
//! The matching pipeline only needs axis-aligned face boxes; where they come
//! from is a backend detail behind [`FaceLocator`]. The shipped backend is
//! [`crate::rustface_backend::RustfaceLocator`]; tests inject stubs.

use crate::types::FaceBounds;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("detection model not found: {0} — download seeta_fd_frontal_v1.0.bin from the rustface repository and place it there")]
    ModelNotFound(PathBuf),
    #[error("cannot read detection model {path}: {source}")]
    ModelRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid detection model {path}: {reason}")]
    ModelInvalid { path: PathBuf, reason: String },
}

/// Pluggable face localization backend.
pub trait FaceLocator {
    /// Locate faces in a row-major grayscale buffer of `width` × `height` bytes.
    ///
    /// Infallible by contract: a backend that finds nothing returns an empty
    /// vector, and backend construction (model loading) is where failures
    /// surface.
    fn locate(&self, gray: &[u8], width: u32, height: u32) -> Vec<FaceBounds>;
}

//! rollcall-core — Histogram face descriptors and gallery matching.
//!
//! Locates the dominant face in an intensity raster (SeetaFace via the
//! `rustface` crate), distills the region into a normalized 256-bin
//! intensity-histogram descriptor, and matches descriptors against a
//! labeled gallery with an ambiguity-aware correlation gate.

pub mod extractor;
pub mod gallery;
pub mod locator;
pub mod rustface_backend;
pub mod types;

pub use extractor::FeatureExtractor;
pub use gallery::{load_gallery, GalleryError};
pub use locator::{FaceLocator, LocatorError};
pub use rustface_backend::RustfaceLocator;
pub use types::{
    CorrelationMatcher, FaceBounds, FaceDescriptor, GalleryEntry, MatchPolicy, MatchResult, Matcher,
};

//! Face descriptor extraction.
//!
//! Pipeline per region: locate the dominant face, crop it, resize to the
//! canonical resolution, smooth, histogram, normalize. Every descriptor that
//! leaves this module has the same shape and normalization regardless of the
//! input region size.

use crate::locator::FaceLocator;
use crate::types::{FaceBounds, FaceDescriptor, DESCRIPTOR_BINS};
use image::DynamicImage;

// --- Named constants (no magic numbers) ---
/// Square resolution face crops are resized to before histogramming.
const CANONICAL_SIZE: usize = 100;
/// Separable 3×3 smoothing kernel ([1, 2, 1] / 4) applied before histogramming.
const SMOOTHING_KERNEL: [f32; 3] = [0.25, 0.5, 0.25];

/// Turns a face region into a [`FaceDescriptor`].
///
/// Owns the localization backend; re-runs it on each input region and keeps
/// only the largest detected face.
pub struct FeatureExtractor {
    locator: Box<dyn FaceLocator>,
}

impl FeatureExtractor {
    pub fn new(locator: Box<dyn FaceLocator>) -> Self {
        Self { locator }
    }

    /// Extract a descriptor from a row-major grayscale raster.
    ///
    /// Returns `None` when no face is found in the region. That is a normal
    /// skip, not an error.
    pub fn extract(&self, gray: &[u8], width: u32, height: u32) -> Option<FaceDescriptor> {
        debug_assert_eq!(gray.len(), width as usize * height as usize);

        let faces = self.locator.locate(gray, width, height);
        let face = largest_face(&faces)?;

        let (crop, crop_w, crop_h) = crop_region(gray, width as usize, height as usize, face)?;
        let mut canonical = resize_bilinear(&crop, crop_w, crop_h, CANONICAL_SIZE, CANONICAL_SIZE);
        smooth(&mut canonical, CANONICAL_SIZE, CANONICAL_SIZE);

        Some(FaceDescriptor::new(normalized_histogram(&canonical)))
    }

    /// Extract a descriptor from a sub-region of a larger raster.
    ///
    /// The region is clamped to the raster, cropped out, and run through
    /// the standard pipeline, localization included.
    pub fn extract_region(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        region: &FaceBounds,
    ) -> Option<FaceDescriptor> {
        let (crop, crop_w, crop_h) =
            crop_region(gray, width as usize, height as usize, region)?;
        self.extract(&crop, crop_w as u32, crop_h as u32)
    }

    /// Extract a descriptor from a decoded image, converting to intensity
    /// first. Used by the gallery bootstrap on image files.
    pub fn extract_image(&self, image: &DynamicImage) -> Option<FaceDescriptor> {
        let gray = image.to_luma8();
        self.extract(gray.as_raw(), gray.width(), gray.height())
    }
}

/// Largest-area detection, first occurrence winning exact-area ties.
fn largest_face(faces: &[FaceBounds]) -> Option<&FaceBounds> {
    let mut best_area = f32::NEG_INFINITY;
    let mut best: Option<&FaceBounds> = None;

    for face in faces {
        let area = face.area();
        if area > best_area {
            best_area = area;
            best = Some(face);
        }
    }

    best
}

/// Clamp the box to the raster and copy it out row by row.
///
/// Returns `None` when nothing of the box lies inside the raster.
fn crop_region(
    gray: &[u8],
    width: usize,
    height: usize,
    face: &FaceBounds,
) -> Option<(Vec<u8>, usize, usize)> {
    let x0 = (face.x.max(0.0) as usize).min(width);
    let y0 = (face.y.max(0.0) as usize).min(height);
    let x1 = ((face.x + face.width).max(0.0) as usize).min(width);
    let y1 = ((face.y + face.height).max(0.0) as usize).min(height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let crop_w = x1 - x0;
    let crop_h = y1 - y0;
    let mut crop = vec![0u8; crop_w * crop_h];

    for row in 0..crop_h {
        let src = (y0 + row) * width + x0;
        let dst = row * crop_w;
        crop[dst..dst + crop_w].copy_from_slice(&gray[src..src + crop_w]);
    }

    Some((crop, crop_w, crop_h))
}

/// Bilinear resize with center-aligned sampling.
fn resize_bilinear(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<u8> {
    let scale_x = src_w as f32 / dst_w as f32;
    let scale_y = src_h as f32 / dst_h as f32;
    let mut out = vec![0u8; dst_w * dst_h];

    for y in 0..dst_h {
        let src_y = (y as f32 + 0.5) * scale_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, src_h as i32 - 1) as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..dst_w {
            let src_x = (x as f32 + 0.5) * scale_x - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, src_w as i32 - 1) as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            let tl = src[y0 * src_w + x0] as f32;
            let tr = src[y0 * src_w + x1] as f32;
            let bl = src[y1 * src_w + x0] as f32;
            let br = src[y1 * src_w + x1] as f32;

            let val = tl * (1.0 - fx) * (1.0 - fy)
                + tr * fx * (1.0 - fy)
                + bl * (1.0 - fx) * fy
                + br * fx * fy;

            out[y * dst_w + x] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

/// In-place separable smoothing pass with clamped borders.
fn smooth(data: &mut [u8], width: usize, height: usize) {
    let mut temp = vec![0.0f32; width * height];

    // Horizontal pass: data → temp
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in SMOOTHING_KERNEL.iter().enumerate() {
                let sx = (x as isize + k as isize - 1).clamp(0, width as isize - 1) as usize;
                sum += data[y * width + sx] as f32 * w;
            }
            temp[y * width + x] = sum;
        }
    }

    // Vertical pass: temp → data
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &w) in SMOOTHING_KERNEL.iter().enumerate() {
                let sy = (y as isize + k as isize - 1).clamp(0, height as isize - 1) as usize;
                sum += temp[sy * width + x] * w;
            }
            data[y * width + x] = sum.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Intensity histogram, L1-normalized to total mass 1.0.
fn normalized_histogram(pixels: &[u8]) -> Vec<f32> {
    let mut counts = [0u32; DESCRIPTOR_BINS];
    for &p in pixels {
        counts[p as usize] += 1;
    }

    let total = pixels.len() as f32;
    counts.iter().map(|&c| c as f32 / total).collect()
}

//! Live attendance loop: capture, detect, match, record.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use rollcall_core::{
    load_gallery, CorrelationMatcher, FaceBounds, FaceLocator, FeatureExtractor, GalleryEntry,
    MatchPolicy, Matcher, RustfaceLocator,
};
use rollcall_hw::{Camera, Frame};
use rollcall_ledger::AttendanceLedger;

use crate::config::Config;

/// Run the attendance loop until the camera stops delivering frames.
///
/// Startup is fail-fast: a missing detection model, an unusable gallery,
/// or an unopenable camera aborts before the loop starts. Inside the
/// loop, every per-face failure is contained to that face.
pub fn run(config: &Config) -> Result<()> {
    let locator = RustfaceLocator::load(&config.model_path)?;
    let frame_locator = locator.clone();
    let extractor = FeatureExtractor::new(Box::new(locator));

    let gallery = load_gallery(&config.gallery_dir, &extractor)?;
    let ledger = AttendanceLedger::new(&config.ledger_path);

    let camera = Camera::open(&config.camera_device)?;
    let mut session = camera.start_stream()?;

    let pipeline = Pipeline {
        locator: &frame_locator,
        extractor: &extractor,
        gallery: &gallery,
        ledger: &ledger,
        policy: config.match_policy(),
        downscale: config.detect_downscale,
        padding: config.region_padding,
    };

    tracing::info!(
        entries = gallery.len(),
        device = %config.camera_device,
        ledger = %config.ledger_path.display(),
        "watching for faces"
    );

    loop {
        let frame = session.next_frame().context("frame capture failed")?;
        pipeline.process_frame(&frame, Local::now().naive_local());
    }
}

/// Everything the per-frame path needs, borrowed for the loop's lifetime.
struct Pipeline<'a> {
    locator: &'a dyn FaceLocator,
    extractor: &'a FeatureExtractor,
    gallery: &'a [GalleryEntry],
    ledger: &'a AttendanceLedger,
    policy: MatchPolicy,
    downscale: u32,
    padding: u32,
}

impl Pipeline<'_> {
    /// Detect on a downscaled raster, then match each face region at full
    /// resolution.
    fn process_frame(&self, frame: &Frame, now: NaiveDateTime) {
        let (small, small_w, small_h) = downscale(
            &frame.data,
            frame.width as usize,
            frame.height as usize,
            self.downscale as usize,
        );
        if small.is_empty() {
            return;
        }

        let detections = self.locator.locate(&small, small_w as u32, small_h as u32);

        for detection in &detections {
            let region = pad_bounds(
                &upscale_bounds(detection, self.downscale),
                self.padding as f32,
                frame.width,
                frame.height,
            );
            self.process_face(frame, &region, now);
        }
    }

    fn process_face(&self, frame: &Frame, region: &FaceBounds, now: NaiveDateTime) {
        let Some(descriptor) =
            self.extractor
                .extract_region(&frame.data, frame.width, frame.height, region)
        else {
            tracing::debug!(seq = frame.sequence, "face region yielded no descriptor");
            return;
        };

        let result = CorrelationMatcher.compare(&descriptor, self.gallery, self.policy);

        let Some(identity) = &result.identity else {
            tracing::debug!(
                seq = frame.sequence,
                score = result.score,
                ambiguous = result.ambiguous,
                "unknown face"
            );
            return;
        };

        tracing::debug!(
            identity = %identity,
            score = result.score,
            seq = frame.sequence,
            "face identified"
        );

        match self.ledger.record_if_absent(identity, now) {
            Ok(outcome) if outcome.recorded => {
                tracing::info!(identity = %identity, score = result.score, "attendance recorded");
            }
            Ok(_) => {} // already recorded today
            Err(e) => {
                tracing::warn!(
                    identity = %identity,
                    error = %e,
                    "attendance write failed; the event can still land on a later frame"
                );
            }
        }
    }
}

/// Area-average downscale by an integer factor.
fn downscale(gray: &[u8], width: usize, height: usize, factor: usize) -> (Vec<u8>, usize, usize) {
    if factor <= 1 {
        return (gray.to_vec(), width, height);
    }

    let new_w = width / factor;
    let new_h = height / factor;
    let mut out = vec![0u8; new_w * new_h];

    for y in 0..new_h {
        for x in 0..new_w {
            let mut sum = 0u32;
            for dy in 0..factor {
                for dx in 0..factor {
                    sum += gray[(y * factor + dy) * width + (x * factor + dx)] as u32;
                }
            }
            out[y * new_w + x] = (sum / (factor * factor) as u32) as u8;
        }
    }

    (out, new_w, new_h)
}

/// Map a detection from the downscaled raster back to frame coordinates.
fn upscale_bounds(b: &FaceBounds, factor: u32) -> FaceBounds {
    let f = factor as f32;
    FaceBounds {
        x: b.x * f,
        y: b.y * f,
        width: b.width * f,
        height: b.height * f,
        confidence: b.confidence,
    }
}

/// Expand a box by `pad` on every side, clamped to the frame.
fn pad_bounds(b: &FaceBounds, pad: f32, frame_w: u32, frame_h: u32) -> FaceBounds {
    let x = (b.x - pad).max(0.0);
    let y = (b.y - pad).max(0.0);
    let right = (b.x + b.width + pad).min(frame_w as f32);
    let bottom = (b.y + b.height + pad).min(frame_h as f32);

    FaceBounds {
        x,
        y,
        width: right - x,
        height: bottom - y,
        confidence: b.confidence,
    }
}

use serde::{Deserialize, Serialize};

/// Number of intensity bins in a face descriptor.
pub const DESCRIPTOR_BINS: usize = 256;

/// Default minimum correlation for a positive match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;

/// Default minimum gap between the best and second-best correlation.
pub const DEFAULT_MATCH_MARGIN: f32 = 0.1;

/// Axis-aligned bounding box for a detected face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl FaceBounds {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Normalized intensity-histogram signature of a face region.
///
/// Always [`DESCRIPTOR_BINS`] non-negative values with total mass 1.0.
/// Immutable once computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceDescriptor {
    values: Vec<f32>,
}

impl FaceDescriptor {
    pub(crate) fn new(values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), DESCRIPTOR_BINS);
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pearson correlation between two descriptors.
    ///
    /// Returns a value in [-1, 1]. Higher = more similar. Two flat
    /// histograms correlate at 1.0; one flat against one non-flat is
    /// uncorrelated (0.0). Accumulates in f64 so 256 small bin values
    /// don't lose precision.
    pub fn correlation(&self, other: &FaceDescriptor) -> f32 {
        let n = self.values.len().min(other.values.len());
        if n == 0 {
            return 0.0;
        }

        let mean_a = self.values[..n].iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        let mean_b = other.values[..n].iter().map(|&v| v as f64).sum::<f64>() / n as f64;

        let mut cov = 0.0f64;
        let mut var_a = 0.0f64;
        let mut var_b = 0.0f64;

        for i in 0..n {
            let da = self.values[i] as f64 - mean_a;
            let db = other.values[i] as f64 - mean_b;
            cov += da * db;
            var_a += da * da;
            var_b += db * db;
        }

        let denom = (var_a * var_b).sqrt();
        if denom < f64::EPSILON {
            let both_flat = var_a < f64::EPSILON && var_b < f64::EPSILON;
            return if both_flat { 1.0 } else { 0.0 };
        }

        (cov / denom) as f32
    }
}

/// One known face: identity label paired with its descriptor.
///
/// The gallery is a fixed-order `Vec<GalleryEntry>` built once at startup;
/// entry order is the deterministic tie-break for equal match scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub label: String,
    pub descriptor: FaceDescriptor,
}

/// Acceptance parameters for gallery matching.
#[derive(Debug, Clone, Copy)]
pub struct MatchPolicy {
    /// Best correlation must strictly exceed this to match.
    pub threshold: f32,
    /// Best must beat second-best by at least this much, or the query
    /// is rejected as ambiguous.
    pub margin: f32,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            margin: DEFAULT_MATCH_MARGIN,
        }
    }
}

/// Result of matching a query descriptor against the gallery.
///
/// `score` and `best_index` are populated even for rejected queries so
/// callers can log near-misses.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub identity: Option<String>,
    pub score: f32,
    /// The best score passed the threshold but not the margin gate.
    pub ambiguous: bool,
    pub best_index: Option<usize>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.identity.is_some()
    }
}

/// Strategy for comparing a query descriptor against the gallery.
pub trait Matcher {
    fn compare(
        &self,
        query: &FaceDescriptor,
        gallery: &[GalleryEntry],
        policy: MatchPolicy,
    ) -> MatchResult;
}

/// Histogram-correlation matcher with a two-stage acceptance gate.
///
/// Stage 1: the best correlation must exceed the threshold. Stage 2: with
/// more than one gallery entry, the best must beat the runner-up by the
/// disambiguation margin — two near-identical scores mean the query could
/// belong to either identity, so it is rejected rather than guessed.
pub struct CorrelationMatcher;

impl Matcher for CorrelationMatcher {
    fn compare(
        &self,
        query: &FaceDescriptor,
        gallery: &[GalleryEntry],
        policy: MatchPolicy,
    ) -> MatchResult {
        let mut best_score = f32::NEG_INFINITY;
        let mut second_score = f32::NEG_INFINITY;
        let mut best_idx: Option<usize> = None;

        // Strict > keeps the first of equal-scoring entries, so gallery
        // order decides ties deterministically.
        for (i, entry) in gallery.iter().enumerate() {
            let score = query.correlation(&entry.descriptor);
            if score > best_score {
                second_score = best_score;
                best_score = score;
                best_idx = Some(i);
            } else if score > second_score {
                second_score = score;
            }
        }

        let Some(idx) = best_idx else {
            return MatchResult {
                identity: None,
                score: 0.0,
                ambiguous: false,
                best_index: None,
            };
        };

        if best_score <= policy.threshold {
            return MatchResult {
                identity: None,
                score: best_score,
                ambiguous: false,
                best_index: Some(idx),
            };
        }

        if gallery.len() > 1 && best_score - second_score < policy.margin {
            return MatchResult {
                identity: None,
                score: best_score,
                ambiguous: true,
                best_index: Some(idx),
            };
        }

        MatchResult {
            identity: Some(gallery[idx].label.clone()),
            score: best_score,
            ambiguous: false,
            best_index: Some(idx),
        }
    }
}

use super::category::{WasteCategory, PRIORITY_ORDER};
use super::result::{ClassificationTally, Detection};

/// Assigns a single label name to a waste category.
///
/// Matching is exact after trimming and lowercasing. Categories are tested in
/// [`PRIORITY_ORDER`], so a keyword listed under two categories resolves to the
/// higher-priority one. Names that match nothing, including empty names, are
/// `Other`.
pub fn categorize(name: &str) -> WasteCategory {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        return WasteCategory::Other;
    }
    PRIORITY_ORDER
        .iter()
        .copied()
        .find(|category| category.keywords().contains(&normalized.as_str()))
        .unwrap_or(WasteCategory::Other)
}

/// Tallies one image's detections by waste category.
///
/// Detections with confidence below `min_confidence` are skipped. Every other
/// detection increments exactly one category, so the tally total equals the
/// number of qualifying detections.
pub fn classify(detections: &[Detection], min_confidence: f32) -> ClassificationTally {
    let mut tally = ClassificationTally::new();
    for detection in detections {
        // False for a NaN confidence or a NaN threshold.
        if !(detection.confidence >= min_confidence) {
            continue;
        }
        tally.increment(categorize(&detection.name));
    }
    tally
}

/// Classifier bound to a confidence threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WasteClassifier {
    min_confidence: f32,
}

impl WasteClassifier {
    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    pub fn classify(&self, detections: &[Detection]) -> ClassificationTally {
        classify(detections, self.min_confidence)
    }
}

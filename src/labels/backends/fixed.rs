use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::classify::Detection;
use crate::labels::backend::LabelDetector;
use crate::labels::backends::http::DetectLabelsResponse;
use crate::upload::ObjectRef;

/// Returns the same labels for every image. Used for dry runs and tests.
#[derive(Clone, Debug, Default)]
pub struct FixedLabelDetector {
    labels: Vec<Detection>,
}

impl FixedLabelDetector {
    pub fn new(labels: Vec<Detection>) -> Self {
        Self { labels }
    }

    /// Loads labels from a JSON file holding either a service response
    /// (`{"Labels": [...]}`) or a bare label array.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read label fixture {}", path.display()))?;
        Ok(Self::new(parse_labels_json(&raw)?))
    }
}

/// Parses a service response or a bare array of labels.
pub fn parse_labels_json(raw: &str) -> Result<Vec<Detection>> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| anyhow!("invalid label json: {}", e))?;
    if value.is_array() {
        return serde_json::from_value(value).map_err(|e| anyhow!("invalid label array: {}", e));
    }
    let response: DetectLabelsResponse =
        serde_json::from_value(value).map_err(|e| anyhow!("invalid label response: {}", e))?;
    Ok(response.labels)
}

impl LabelDetector for FixedLabelDetector {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn detect_labels(
        &self,
        _image: &ObjectRef,
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Vec<Detection>> {
        Ok(self
            .labels
            .iter()
            .filter(|label| label.confidence >= min_confidence)
            .take(max_labels as usize)
            .cloned()
            .collect())
    }
}

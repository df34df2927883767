//! Label detection.
//!
//! Object recognition is delegated to an external service; this module only
//! carries requests to it and labels back. Backends:
//! - `HttpLabelDetector`: DetectLabels JSON over HTTP
//! - `FixedLabelDetector`: labels from a JSON fixture (`stub://` sources)

mod backend;
mod backends;

use anyhow::{anyhow, Result};
use std::path::Path;
use std::time::Duration;

pub use backend::LabelDetector;
pub use backends::fixed::parse_labels_json;
pub use backends::{FixedLabelDetector, HttpLabelDetector};

/// Builds a detector from a service location.
///
/// `stub://` uses [`FixedLabelDetector`] with labels from `fixture` (no labels
/// when absent); http(s) URLs use [`HttpLabelDetector`].
pub fn detector_from_location(
    location: &str,
    fixture: Option<&Path>,
    bearer_token: Option<String>,
    timeout: Duration,
) -> Result<Box<dyn LabelDetector>> {
    if location.starts_with("stub://") {
        let detector = match fixture {
            Some(path) => FixedLabelDetector::from_json_file(path)?,
            None => FixedLabelDetector::default(),
        };
        return Ok(Box::new(detector));
    }
    if location.starts_with("http://") || location.starts_with("https://") {
        return Ok(Box::new(HttpLabelDetector::new(
            location,
            bearer_token,
            timeout,
        )?));
    }
    Err(anyhow!(
        "unsupported label service '{}'; expected http(s) url or stub://",
        location
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_selects_backend() {
        let timeout = Duration::from_secs(1);
        assert_eq!(
            detector_from_location("stub://labels", None, None, timeout)
                .unwrap()
                .name(),
            "fixed"
        );
        assert_eq!(
            detector_from_location("https://labels.local/", None, None, timeout)
                .unwrap()
                .name(),
            "http"
        );
        assert!(detector_from_location("labels.local", None, None, timeout).is_err());
        assert!(detector_from_location(
            "stub://labels",
            Some(Path::new("/nonexistent/labels.json")),
            None,
            timeout
        )
        .is_err());
    }
}

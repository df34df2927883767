use anyhow::Result;

use crate::classify::Detection;
use crate::upload::ObjectRef;

/// Label-detection service.
///
/// Implementations return labels for a stored image, ordered as the service
/// reports them. The classifier re-applies `min_confidence`, so backends may
/// or may not filter on it themselves.
pub trait LabelDetector {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Request up to `max_labels` labels with at least `min_confidence`.
    ///
    /// Transient service failures are reported as
    /// [`TransientError`](crate::retry::TransientError).
    fn detect_labels(
        &self,
        image: &ObjectRef,
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Vec<Detection>>;
}

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::classify::Detection;
use crate::labels::backend::LabelDetector;
use crate::retry::TransientError;
use crate::upload::ObjectRef;

const DETECT_LABELS_TARGET: &str = "RekognitionService.DetectLabels";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectLabelsRequest<'a> {
    image: ImageSource<'a>,
    max_labels: u32,
    min_confidence: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ImageSource<'a> {
    s3_object: S3Object<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct S3Object<'a> {
    bucket: &'a str,
    name: &'a str,
}

/// Response body of a DetectLabels call. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct DetectLabelsResponse {
    #[serde(rename = "Labels", default)]
    pub labels: Vec<Detection>,
}

/// HTTP backend speaking the DetectLabels JSON protocol.
pub struct HttpLabelDetector {
    endpoint: Url,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpLabelDetector {
    pub fn new(endpoint: &str, bearer_token: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).context("parse label service url")?;
        match endpoint.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported label service scheme '{}'; expected http(s)",
                    other
                ))
            }
        }
        Ok(Self {
            endpoint,
            bearer_token,
            timeout,
        })
    }
}

/// JSON request body for `image`.
pub(crate) fn request_body(
    image: &ObjectRef,
    max_labels: u32,
    min_confidence: f32,
) -> Result<serde_json::Value> {
    let request = DetectLabelsRequest {
        image: ImageSource {
            s3_object: S3Object {
                bucket: &image.bucket,
                name: &image.key,
            },
        },
        max_labels,
        min_confidence,
    };
    serde_json::to_value(request).context("encode label request")
}

impl LabelDetector for HttpLabelDetector {
    fn name(&self) -> &'static str {
        "http"
    }

    fn detect_labels(
        &self,
        image: &ObjectRef,
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Vec<Detection>> {
        let body = request_body(image, max_labels, min_confidence)?;
        let mut request = ureq::post(self.endpoint.as_str())
            .timeout(self.timeout)
            .set("Content-Type", CONTENT_TYPE)
            .set("X-Amz-Target", DETECT_LABELS_TARGET);
        if let Some(token) = &self.bearer_token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let response = match request.send_json(body) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) if code == 429 || code >= 500 => {
                return Err(
                    TransientError::new(format!("label service returned HTTP {}", code)).into(),
                )
            }
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                return Err(anyhow!(
                    "label service rejected {} with HTTP {}: {}",
                    image.key,
                    code,
                    detail.trim()
                ));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransientError::new(transport.to_string()).into())
            }
        };

        let parsed: DetectLabelsResponse = response
            .into_json()
            .context("decode label service response")?;
        log::debug!(
            "label service returned {} labels for {}",
            parsed.labels.len(),
            image.key
        );
        Ok(parsed.labels)
    }
}

//! Object storage upload.
//!
//! `ObjectStore` puts a local file at `<bucket>/<key>`. Backends:
//! - `HttpObjectStore`: HTTP PUT to an S3-compatible endpoint
//! - `FilesystemObjectStore`: copy into a local directory tree
//!
//! Callers remove the local file only after a successful put; a failed upload
//! leaves it in place for inspection or a later retry.

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::retry::TransientError;

/// Reference to an uploaded object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    /// Reference from a key as carried in storage event notifications:
    /// form-encoded, with `+` for spaces.
    pub fn from_event_key(bucket: &str, encoded_key: &str) -> Result<Self> {
        if bucket.trim().is_empty() {
            return Err(anyhow!("bucket must not be empty"));
        }
        let spaced = encoded_key.replace('+', " ");
        let key = percent_encoding::percent_decode_str(&spaced)
            .decode_utf8()
            .with_context(|| format!("object key '{}' is not valid UTF-8", encoded_key))?
            .into_owned();
        if key.trim_matches('/').is_empty() {
            return Err(anyhow!("object key must not be empty"));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key,
        })
    }
}

/// Destination for captured images.
pub trait ObjectStore {
    /// Store identifier for logs.
    fn name(&self) -> &'static str;

    /// Uploads `local_path` as `bucket/key`.
    fn put(&self, local_path: &Path, bucket: &str, key: &str) -> Result<ObjectRef>;
}

/// S3-compatible HTTP store.
pub struct HttpObjectStore {
    base: Url,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, bearer_token: Option<String>, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).context("parse upload url")?;
        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported upload scheme '{}'; expected http(s)",
                    other
                ))
            }
        }
        Ok(Self {
            base,
            bearer_token,
            timeout,
        })
    }

    /// URL an object is PUT to.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("upload url cannot be a base"))?;
            segments.pop_if_empty().push(bucket);
            for part in key.split('/').filter(|part| !part.is_empty()) {
                segments.push(part);
            }
        }
        Ok(url)
    }
}

impl ObjectStore for HttpObjectStore {
    fn name(&self) -> &'static str {
        "http"
    }

    fn put(&self, local_path: &Path, bucket: &str, key: &str) -> Result<ObjectRef> {
        let body = std::fs::read(local_path)
            .with_context(|| format!("read {} for upload", local_path.display()))?;
        let url = self.object_url(bucket, key)?;
        let digest = hex::encode(Sha256::digest(&body));

        let mut request = ureq::put(url.as_str())
            .timeout(self.timeout)
            .set("Content-Type", content_type_for(local_path))
            .set("x-amz-content-sha256", &digest);
        if let Some(token) = &self.bearer_token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        match request.send_bytes(&body) {
            Ok(_) => {}
            Err(ureq::Error::Status(code, _)) if code == 429 || code >= 500 => {
                return Err(TransientError::new(format!("upload returned HTTP {}", code)).into())
            }
            Err(ureq::Error::Status(code, _)) => {
                return Err(anyhow!("upload of {} rejected with HTTP {}", key, code))
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransientError::new(transport.to_string()).into())
            }
        }

        log::info!("uploaded {} ({} bytes) to {}", key, body.len(), url);
        Ok(ObjectRef {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

/// Local directory store laid out as `<root>/<bucket>/<key>`.
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let mut path = self.root.join(validate_segment(bucket)?);
        for part in key.split('/').filter(|part| !part.is_empty()) {
            path.push(validate_segment(part)?);
        }
        Ok(path)
    }
}

impl ObjectStore for FilesystemObjectStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn put(&self, local_path: &Path, bucket: &str, key: &str) -> Result<ObjectRef> {
        let dest = self.object_path(bucket, key)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create object directory {}", parent.display()))?;
        }
        std::fs::copy(local_path, &dest).with_context(|| {
            format!("copy {} to {}", local_path.display(), dest.display())
        })?;
        log::info!("stored {} at {}", key, dest.display());
        Ok(ObjectRef {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

/// Picks a backend from a location string: http(s) URLs use
/// [`HttpObjectStore`], anything else is a local directory.
pub fn store_from_location(
    location: &str,
    bearer_token: Option<String>,
    timeout: Duration,
) -> Result<Box<dyn ObjectStore>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return Ok(Box::new(HttpObjectStore::new(
            location,
            bearer_token,
            timeout,
        )?));
    }
    if location.contains("://") {
        return Err(anyhow!(
            "unsupported upload location '{}'; expected http(s) url or local path",
            location
        ));
    }
    Ok(Box::new(FilesystemObjectStore::new(location)))
}

/// Uploads `local_path`, then removes it unless `keep_local` is set.
///
/// The file is left untouched when the upload fails.
pub fn upload_then_remove(
    store: &dyn ObjectStore,
    local_path: &Path,
    bucket: &str,
    key: &str,
    keep_local: bool,
) -> Result<ObjectRef> {
    let object = store.put(local_path, bucket, key)?;
    if !keep_local {
        std::fs::remove_file(local_path)
            .with_context(|| format!("remove uploaded snapshot {}", local_path.display()))?;
    }
    Ok(object)
}

fn validate_segment(segment: &str) -> Result<&str> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
        return Err(anyhow!("invalid object path segment '{}'", segment));
    }
    Ok(segment)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

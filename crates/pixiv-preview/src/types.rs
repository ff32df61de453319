//! Core data types for preview batches, stored artifacts and errors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One thumbnail to fetch: the caption to draw and where its bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub description: String,
    pub url: String,
}

impl PreviewRequest {
    pub fn new(description: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            url: url.into(),
        }
    }
}

/// A resolved preview request.
///
/// `image_bytes` is `None` when the fetch failed; batches only ever hold
/// resolved items with bytes, positional slot lists keep the failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewItem {
    pub description: String,
    pub source_url: String,
    pub image_bytes: Option<Vec<u8>>,
}

impl PreviewItem {
    /// Whether the fetch for this item succeeded.
    pub fn is_fetched(&self) -> bool {
        self.image_bytes.is_some()
    }
}

/// A named, ordered collection of successfully fetched preview items.
///
/// `count` always equals the number of items; the only way to build a batch
/// is [`PreviewBatch::new`], which derives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewBatch {
    name: String,
    items: Vec<PreviewItem>,
    count: usize,
}

impl PreviewBatch {
    /// Build a batch, keeping only fetched items in their given order.
    pub fn new(name: impl Into<String>, items: Vec<PreviewItem>) -> Self {
        let items: Vec<PreviewItem> = items.into_iter().filter(|i| i.is_fetched()).collect();
        let count = items.len();
        Self {
            name: name.into(),
            items,
            count,
        }
    }

    /// An empty batch.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[PreviewItem] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Where a composed preview ended up after the sink accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPreview {
    pub file_name: String,
    pub location: PathBuf,
    pub size_bytes: usize,
}

/// Errors from a single resource fetch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The call could not complete (connect failure, reset, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote answered with a non-success status.
    #[error("Network error: status {status} for {url}")]
    Network { status: u16, url: String },
}

/// Errors from turning a document into a typed entity.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Malformed field {field}: {value:?}")]
    Malformed { field: String, value: String },
}

impl ExtractionError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn malformed(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Malformed {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Errors that can occur anywhere in the preview pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PreviewError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Composition error: {0}")]
    Composition(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for PreviewError {
    fn from(e: tokio::task::JoinError) -> Self {
        PreviewError::TaskJoin(e.to_string())
    }
}

/// Convenience result type.
pub type PreviewResult<T> = Result<T, PreviewError>;

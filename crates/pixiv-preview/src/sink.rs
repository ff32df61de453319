//! Persistence for composed previews.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::config::PreviewConfig;
use crate::types::{PreviewError, PreviewResult, StoredPreview};

/// Accepts finished preview bytes and reports where they were stored.
///
/// Once `store` returns `Ok`, the bytes are durably written.
#[async_trait]
pub trait PreviewSink: Send + Sync {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> PreviewResult<StoredPreview>;
}

/// Suffixed names tried before a store gives up on a taken file name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Writes previews as files into one folder.
///
/// An existing file is never replaced: when the name is taken the preview
/// lands at `{stem}-{n}.{ext}` instead.
#[derive(Debug, Clone)]
pub struct FolderSink {
    dir: PathBuf,
}

impl FolderSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &PreviewConfig) -> Self {
        Self::new(config.output_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PreviewSink for FolderSink {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> PreviewResult<StoredPreview> {
        validate_file_name(file_name)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Readers never observe a partial file: the bytes are staged under a
        // per-call name, then linked into place.
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let staging = self
            .dir
            .join(format!(".{file_name}.{}.{seq}.part", std::process::id()));
        tokio::fs::write(&staging, &bytes).await?;

        let claimed = claim_name(&self.dir, &staging, file_name).await;
        if let Err(e) = tokio::fs::remove_file(&staging).await {
            tracing::warn!("Could not remove staging file {}: {e}", staging.display());
        }
        let (file_name, location) = claimed?;

        tracing::info!("Stored preview {} ({} bytes)", location.display(), bytes.len());
        Ok(StoredPreview {
            file_name,
            location,
            size_bytes: bytes.len(),
        })
    }
}

/// Link `staging` to the first free name derived from `file_name`.
///
/// `hard_link` fails on an existing target, so two stores racing for the
/// same name each end up with their own file.
async fn claim_name(
    dir: &Path,
    staging: &Path,
    file_name: &str,
) -> PreviewResult<(String, PathBuf)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = numbered_name(file_name, attempt);
        let location = dir.join(&candidate);
        match tokio::fs::hard_link(staging, &location).await {
            Ok(()) => return Ok((candidate, location)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(PreviewError::Sink(format!(
        "No free name for {file_name:?} after {MAX_NAME_ATTEMPTS} attempts"
    )))
}

/// `name` itself for attempt 0, then `{stem}-{n}.{ext}`.
fn numbered_name(file_name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{attempt}.{ext}"),
        _ => format!("{file_name}-{attempt}"),
    }
}

fn validate_file_name(file_name: &str) -> PreviewResult<()> {
    if file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\'])
    {
        return Err(PreviewError::Sink(format!(
            "Invalid preview file name: {file_name:?}"
        )));
    }
    Ok(())
}

//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::PreviewResult;

/// Environment variable overriding the output folder.
pub const ENV_OUTPUT_DIR: &str = "PIXIV_PREVIEW_DIR";
/// Environment variable overriding the artwork preview fetch cap.
pub const ENV_PREVIEW_FETCH_LIMIT: &str = "PIXIV_PREVIEW_FETCH_LIMIT";
/// Environment variable overriding the avatar/thumbnail fetch cap.
pub const ENV_THUMB_FETCH_LIMIT: &str = "PIXIV_THUMB_FETCH_LIMIT";
/// Environment variable carrying the session cookie.
pub const ENV_SESSION_COOKIE: &str = "PIXIV_PHPSESSID";

/// Settings threaded through every pipeline call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// In-flight cap for avatar and card thumbnail fetches.
    pub thumbnail_fetch_limit: usize,
    /// In-flight cap for artwork preview batches.
    pub preview_fetch_limit: usize,
    /// Cards fetched and composed at the same time.
    pub card_render_limit: usize,
    /// Card width divided by card height.
    pub user_card_ratio: f32,
    pub user_card_width: u32,
    /// Maximum users rendered from one search page.
    pub user_card_num: usize,
    pub thumbs_per_card: usize,
    /// Size of one tile in a thumbnail grid.
    pub preview_size: (u32, u32),
    pub preview_columns: usize,
    /// Maximum tiles loaded into one thumbnail grid.
    pub preview_limit: usize,
    pub hold_ratio: bool,
    /// Logical font identifier handed to the font loader.
    pub font_id: String,
    pub header_color: [u8; 3],
    pub jpeg_quality: u8,
    pub output_dir: PathBuf,
    pub request_timeout_ms: u64,
    pub referer: String,
    pub session_cookie: Option<String>,
    pub article_root_url: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            thumbnail_fetch_limit: 10,
            preview_fetch_limit: 30,
            card_render_limit: 10,
            user_card_ratio: 6.75,
            user_card_width: 1600,
            user_card_num: 8,
            thumbs_per_card: 4,
            preview_size: (256, 256),
            preview_columns: 6,
            preview_limit: 1000,
            hold_ratio: false,
            font_id: "default".to_string(),
            header_color: [0, 150, 250],
            jpeg_quality: 90,
            output_dir: PathBuf::from("preview"),
            request_timeout_ms: 45_000,
            referer: "https://www.pixiv.net/".to_string(),
            session_cookie: None,
            article_root_url: "https://www.pixivision.net".to_string(),
        }
    }
}

impl PreviewConfig {
    /// Load from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> PreviewResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(limit) = parse_limit(&lookup, ENV_PREVIEW_FETCH_LIMIT) {
            self.preview_fetch_limit = limit;
        }
        if let Some(limit) = parse_limit(&lookup, ENV_THUMB_FETCH_LIMIT) {
            self.thumbnail_fetch_limit = limit;
        }
        if let Some(cookie) = lookup(ENV_SESSION_COOKIE) {
            if !cookie.is_empty() {
                self.session_cookie = Some(cookie);
            }
        }
        self
    }
}

fn parse_limit(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => {
            tracing::warn!("Ignoring invalid {key}={raw:?}");
            None
        }
        Ok(v) => Some(v),
    }
}

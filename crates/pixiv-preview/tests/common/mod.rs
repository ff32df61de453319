//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};

use pixiv_preview::{
    FetchError, PreviewError, PreviewResult, PreviewSink, ResourceFetcher, StoredPreview,
};

// ─────────────────────── fetcher ───────────────────────

/// Serves registered urls from memory; anything else is a 404.
///
/// Records the highest number of fetches seen in flight at once.
#[derive(Default)]
pub struct MapFetcher {
    resources: HashMap<String, Vec<u8>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn serve(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.resources.insert(url.to_string(), bytes);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceFetcher for MapFetcher {
    async fn fetch(&self, url: &str, _params: &[(String, String)]) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = self
            .resources
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Network {
                status: 404,
                url: url.to_string(),
            });

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ─────────────────────── sink ───────────────────────

/// Keeps stored previews in memory.
#[derive(Default)]
pub struct MemorySink {
    stored: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Vec<(String, Vec<u8>)> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl PreviewSink for MemorySink {
    async fn store(&self, file_name: &str, bytes: Vec<u8>) -> PreviewResult<StoredPreview> {
        let size_bytes = bytes.len();
        self.stored
            .lock()
            .map_err(|_| PreviewError::Sink("poisoned".into()))?
            .push((file_name.to_string(), bytes));
        Ok(StoredPreview {
            file_name: file_name.to_string(),
            location: format!("memory://{file_name}").into(),
            size_bytes,
        })
    }
}

// ─────────────────────── images & markup ───────────────────────

/// Solid colour PNG.
pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    img.write_with_encoder(encoder).unwrap();
    buf
}

pub fn avatar_url(id: &str) -> String {
    format!("https://i.pximg.net/user-profile/{id}.png")
}

pub fn thumb_url(id: &str, n: usize) -> String {
    format!("https://i.pximg.net/c/thumb/{id}_{n}.jpg")
}

/// One entry of a user search results page with `thumbs` thumbnails.
pub fn user_search_item(id: &str, name: &str, thumbs: usize) -> String {
    let thumbnails: String = (0..thumbs)
        .map(|n| {
            format!(
                r#"<li class="action-open-thumbnail"><a data-src="{}"></a></li>"#,
                thumb_url(id, n)
            )
        })
        .collect();
    format!(
        r#"<li class="user-recommendation-item">
            <a class="_user-icon size-128 cover-texture" data-src="{avatar}" title="{name}"></a>
            <h1><a href="/users/{id}">{name}</a></h1>
            <dl class="meta inline-list"><dt>Works</dt><dd><a href="/users/{id}/artworks">12</a></dd></dl>
            <p class="caption">draws things</p>
            <ul>{thumbnails}</ul>
        </li>"#,
        avatar = avatar_url(id),
    )
}

pub fn user_search_page(search_name: &str, count: &str, items: &[String]) -> String {
    format!(
        r#"<html><body>
        <div class="column-header"><h1 class="column-title">{search_name}</h1><span class="count-badge">{count}</span></div>
        <ul>{}</ul>
        </body></html>"#,
        items.concat()
    )
}

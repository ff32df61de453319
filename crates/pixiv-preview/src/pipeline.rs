//! Fetch, parse, compose and store, with every setting passed in.
//!
//! Fetches run on the async runtime under the configured caps; raster work
//! goes to the blocking pool so a large grid never stalls other batches.

use std::sync::Arc;

use chrono::Local;
use futures::stream::{self, StreamExt};
use image::RgbImage;

use crate::card::{compose_user_card, CardFonts, CardGeometry, CardImages};
use crate::config::PreviewConfig;
use crate::extract::{extract, PageKind, SelectorSchema};
use crate::fetch::{HttpFetcher, ResourceFetcher};
use crate::font::FontLoader;
use crate::grid::{
    compose_thumbnail_grid, compose_user_search_grid, encode_jpeg, preview_file_name,
    user_search_title_size, GridFonts, ThumbnailGridOptions,
};
use crate::model::{ArtworkSearchResult, ExtractedEntity, UserSearchPage, UserSearchResult};
use crate::request::{
    fetch_urls, preview_requests_from_artwork_search, preview_requests_from_entity,
    request_preview_batch,
};
use crate::sink::{FolderSink, PreviewSink};
use crate::types::{PreviewBatch, PreviewRequest, PreviewResult, StoredPreview};

const BATCH_FILE_PREFIX: &str = "preview";
const USER_SEARCH_FILE_PREFIX: &str = "preview_search_user";

/// The preview pipeline and its collaborators.
#[derive(Clone)]
pub struct PreviewPipeline {
    fetcher: Arc<dyn ResourceFetcher>,
    fonts: Arc<dyn FontLoader>,
    sink: Arc<dyn PreviewSink>,
    config: PreviewConfig,
    schema: SelectorSchema,
}

impl PreviewPipeline {
    pub fn new(
        fetcher: Arc<dyn ResourceFetcher>,
        fonts: Arc<dyn FontLoader>,
        sink: Arc<dyn PreviewSink>,
        config: PreviewConfig,
    ) -> Self {
        Self {
            fetcher,
            fonts,
            sink,
            config,
            schema: SelectorSchema::default(),
        }
    }

    /// Pipeline over HTTP writing into the configured output folder.
    pub fn http(config: PreviewConfig, fonts: Arc<dyn FontLoader>) -> PreviewResult<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        let sink = FolderSink::from_config(&config);
        Ok(Self::new(Arc::new(fetcher), fonts, Arc::new(sink), config))
    }

    /// Replace the selector set used by [`Self::fetch_entity`].
    pub fn with_schema(mut self, schema: SelectorSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Fetch a page and parse it as `kind`.
    pub async fn fetch_entity(
        &self,
        url: &str,
        params: &[(String, String)],
        kind: PageKind,
    ) -> PreviewResult<ExtractedEntity> {
        let html = self.fetcher.fetch_text(url, params).await?;
        let entity = extract(&html, kind, &self.config.article_root_url, &self.schema)?;
        tracing::debug!("Extracted {kind:?} from {url}");
        Ok(entity)
    }

    /// Fetch a named batch under the artwork preview cap.
    pub async fn request_batch(&self, name: &str, requests: Vec<PreviewRequest>) -> PreviewBatch {
        request_preview_batch(
            self.fetcher.as_ref(),
            name,
            requests,
            self.config.preview_fetch_limit,
        )
        .await
    }

    /// Fetch the thumbnails referenced by any extracted entity.
    pub async fn preview_batch_from_entity(
        &self,
        name: &str,
        entity: &ExtractedEntity,
    ) -> PreviewBatch {
        self.request_batch(name, preview_requests_from_entity(entity))
            .await
    }

    /// Fetch the thumbnails of an artwork search result list.
    pub async fn preview_batch_from_artwork_search(
        &self,
        name: &str,
        results: &[ArtworkSearchResult],
    ) -> PreviewBatch {
        self.request_batch(name, preview_requests_from_artwork_search(results))
            .await
    }

    /// Compose a batch into a thumbnail grid with the configured options
    /// and store it.
    pub async fn render_preview_batch(&self, batch: &PreviewBatch) -> PreviewResult<StoredPreview> {
        let options = ThumbnailGridOptions::from_config(&self.config);
        self.render_preview_batch_with(batch, options).await
    }

    pub async fn render_preview_batch_with(
        &self,
        batch: &PreviewBatch,
        options: ThumbnailGridOptions,
    ) -> PreviewResult<StoredPreview> {
        let fonts = GridFonts::load(self.fonts.as_ref(), &self.config.font_id, &options)?;
        let quality = self.config.jpeg_quality;
        let owned = batch.clone();

        let bytes = tokio::task::spawn_blocking(move || {
            let canvas = compose_thumbnail_grid(&owned, &options, &fonts)?;
            encode_jpeg(&canvas, quality)
        })
        .await??;

        let file_name = preview_file_name(BATCH_FILE_PREFIX, batch.name(), Local::now());
        self.sink.store(&file_name, bytes).await
    }

    /// Fetch one user's avatar and thumbnails and compose their card.
    ///
    /// Fails only when the avatar cannot be fetched; missing thumbnails
    /// become placeholders.
    pub async fn render_user_card(
        &self,
        user: &UserSearchResult,
        geometry: &CardGeometry,
        fonts: &CardFonts,
    ) -> PreviewResult<RgbImage> {
        let limit = self.config.thumbnail_fetch_limit;
        let max_thumbs = self.config.thumbs_per_card;
        let thumb_urls: Vec<String> = user.thumbnail_urls.iter().take(max_thumbs).cloned().collect();

        let (avatar, thumbnails) = tokio::join!(
            self.fetcher.fetch(&user.avatar_url, &[]),
            fetch_urls(self.fetcher.as_ref(), &thumb_urls, limit),
        );
        let images = CardImages {
            avatar: avatar?,
            thumbnails,
        };

        let user = user.clone();
        let geometry = *geometry;
        let fonts = fonts.clone();
        let card = tokio::task::spawn_blocking(move || {
            compose_user_card(&user, &images, &fonts, &geometry, max_thumbs)
        })
        .await?;
        Ok(card)
    }

    /// Render the first users of a search page as cards, stack them into one
    /// image and store it.
    ///
    /// Users whose card fails are left out; the rest keep their order.
    pub async fn render_user_search(&self, page: &UserSearchPage) -> PreviewResult<StoredPreview> {
        let geometry = CardGeometry::new(self.config.user_card_width, self.config.user_card_ratio)?;
        let card_fonts = CardFonts::load(self.fonts.as_ref(), &self.config.font_id, &geometry)?;
        let title_font = self
            .fonts
            .load(&self.config.font_id, user_search_title_size(&geometry))?;

        let users = &page.users[..page.users.len().min(self.config.user_card_num)];
        let results: Vec<PreviewResult<RgbImage>> = stream::iter(users)
            .map(|user| self.render_user_card(user, &geometry, &card_fonts))
            .buffered(self.config.card_render_limit.max(1))
            .collect()
            .await;

        let cards: Vec<RgbImage> = results
            .into_iter()
            .zip(users)
            .filter_map(|(result, user)| match result {
                Ok(card) => Some(card),
                Err(e) => {
                    tracing::warn!("Dropping card for user {}: {e}", user.user_id);
                    None
                }
            })
            .collect();
        tracing::info!(
            "User search {:?}: {} of {} cards rendered",
            page.search_name,
            cards.len(),
            users.len()
        );

        let search_name = page.search_name.clone();
        let count = page.count.clone();
        let quality = self.config.jpeg_quality;
        let bytes = tokio::task::spawn_blocking(move || {
            let canvas = compose_user_search_grid(
                &search_name,
                &count,
                &cards,
                &geometry,
                title_font.as_ref(),
            )?;
            encode_jpeg(&canvas, quality)
        })
        .await??;

        let file_name = preview_file_name(USER_SEARCH_FILE_PREFIX, &page.search_name, Local::now());
        self.sink.store(&file_name, bytes).await
    }
}

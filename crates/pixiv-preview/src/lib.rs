//! Pixiv preview: fetch gallery pages, extract typed entities and compose
//! preview images from many concurrently fetched thumbnails.
//!
//! The pieces compose bottom-up: [`fetch`] turns urls into bytes,
//! [`extract`] turns markup into [`model`] entities, [`request`] fetches
//! thumbnail batches under a concurrency cap, [`card`] and [`grid`] draw,
//! and [`sink`] stores the result. [`pipeline::PreviewPipeline`] wires them
//! together around one [`config::PreviewConfig`].

pub mod card;
pub mod config;
pub mod draw;
pub mod extract;
pub mod fetch;
pub mod font;
pub mod grid;
pub mod model;
pub mod pipeline;
pub mod request;
pub mod sink;
pub mod types;

pub use card::{compose_user_card, CardFonts, CardGeometry, CardImages};
pub use config::PreviewConfig;
pub use extract::{extract, parse_artwork_ref, parse_id, MatchMode, PageKind, SelectorSchema};
pub use fetch::{HttpFetcher, ResourceFetcher};
pub use font::{
    wrap_text, BlockFont, BlockFontLoader, FontLoader, GlyphFontLoader, TextExtent, TextFont,
};
pub use grid::{
    compose_thumbnail_grid, compose_user_search_grid, encode_jpeg, preview_file_name, GridFonts,
    GridLayout, ThumbnailGridOptions,
};
pub use model::*;
pub use pipeline::PreviewPipeline;
pub use request::{
    fetch_slots, fetch_urls, format_artwork_preview_desc, request_preview_batch,
    DEFAULT_DESC_LIMIT,
};
pub use sink::{FolderSink, PreviewSink};
pub use types::*;

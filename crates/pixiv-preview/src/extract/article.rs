//! Article listing and article detail pages.
//!
//! Detail pages come in two layouts. The layout is classified first by
//! probing for the feature container, then the matching description anchor
//! is read; there is no fallback between the two.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::schema::{ArticleDetailSelectors, ArticleListingSelectors};
use super::{
    absolutize, attr, compile, first, parse_id, require, require_attr, stripped_text,
    tag_id_from_href, text_of, MatchMode,
};
use crate::model::{
    ArticleArtwork, ArticleCard, ArticleDetail, ArticleLayout, ArticleListing, ArticleTag,
};
use crate::types::ExtractionError;

/// Parse an article listing page. A page without cards is an empty listing.
pub fn parse_article_listing(
    html: &str,
    root_url: &str,
    s: &ArticleListingSelectors,
) -> Result<ArticleListing, ExtractionError> {
    let card_sel = compile(&s.card)?;
    let title_sel = compile(&s.title_link)?;
    let thumb_sel = compile(&s.thumbnail)?;
    let tag_item_sel = compile(&s.tag_item)?;
    let tag_link_sel = compile(&s.tag_link)?;

    let document = Html::parse_document(html);
    let articles = document
        .root_element()
        .select(&card_sel)
        .filter_map(|card| {
            let parsed = parse_card(card, root_url, s, &title_sel, &thumb_sel).map(|mut c| {
                c.tags = card
                    .select(&tag_item_sel)
                    .filter_map(|li| {
                        let link = first(li, &tag_link_sel)?;
                        let name = stripped_text(li);
                        parse_tag(link, name, root_url)
                    })
                    .collect();
                c
            });
            match parsed {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::debug!("Skipping article card: {e}");
                    None
                }
            }
        })
        .collect();

    Ok(ArticleListing { articles })
}

fn parse_card(
    card: ElementRef<'_>,
    root_url: &str,
    s: &ArticleListingSelectors,
    title_sel: &Selector,
    thumb_sel: &Selector,
) -> Result<ArticleCard, ExtractionError> {
    let link = require(card, title_sel, "article_card.title")?;
    let article_id = require_attr(link, &s.id_attr, "article_card.id")?;
    let href = require_attr(link, "href", "article_card.href")?;
    let title = stripped_text(link);
    if title.is_empty() {
        return Err(ExtractionError::missing("article_card.title"));
    }

    let thumb = require(card, thumb_sel, "article_card.thumbnail")?;
    let style = require_attr(thumb, &s.thumbnail_style_attr, "article_card.thumbnail")?;
    let thumbnail_url = background_image_url(&style)
        .ok_or_else(|| ExtractionError::malformed("article_card.thumbnail", style.as_str()))?;

    Ok(ArticleCard {
        article_id,
        title,
        thumbnail_url,
        url: absolutize(root_url, &href),
        tags: Vec::new(),
    })
}

/// Url inside a `background-image: url(...)` declaration.
pub(crate) fn background_image_url(style: &str) -> Option<String> {
    static BACKGROUND: OnceLock<Regex> = OnceLock::new();
    let re = BACKGROUND.get_or_init(|| {
        Regex::new(r"^background-image:\s*url\((.+)\);?$").expect("static regex")
    });
    let raw = re.captures(style.trim())?.get(1)?.as_str();
    let url = raw.trim().trim_matches(|c| c == '\'' || c == '"');
    (!url.is_empty()).then(|| url.to_string())
}

fn parse_tag(link: ElementRef<'_>, name: String, root_url: &str) -> Option<ArticleTag> {
    let href = attr(link, "href")?;
    if name.is_empty() {
        return None;
    }
    Some(ArticleTag {
        tag_id: tag_id_from_href(&href),
        tag_name: name,
        tag_url: absolutize(root_url, &href),
    })
}

/// Decide which layout an article body uses.
pub fn classify_article_layout(body: ElementRef<'_>, feature_body: &Selector) -> ArticleLayout {
    if first(body, feature_body).is_some() {
        ArticleLayout::Feature
    } else {
        ArticleLayout::Standard
    }
}

/// Parse a single article page.
///
/// Title, body and the layout's description are required. Artworks and
/// tags that fail to parse are dropped individually.
pub fn parse_article_detail(
    html: &str,
    root_url: &str,
    s: &ArticleDetailSelectors,
) -> Result<ArticleDetail, ExtractionError> {
    let main_sel = compile(&s.main)?;
    let title_sel = compile(&s.title)?;
    let desc_sel = compile(&s.description)?;
    let eyecatch_sel = compile(&s.eyecatch_image)?;
    let tag_list_sel = compile(&s.tag_list)?;
    let tag_link_sel = compile(&s.tag_link)?;
    let body_sel = compile(&s.body)?;
    let feature_sel = compile(&s.feature_body)?;
    let feature_desc_sel = compile(&s.feature_description)?;
    let work_sel = compile(&s.work_main)?;
    let works = WorkSelectors {
        user: compile(&s.work_user)?,
        title: compile(&s.work_title)?,
        link: compile(&s.work_link)?,
        image: compile(&s.work_image)?,
    };

    let document = Html::parse_document(html);
    let root = document.root_element();

    let main = require(root, &main_sel, "article.main")?;
    let title = stripped_text(require(main, &title_sel, "article.title")?);
    let body = require(main, &body_sel, "article.body")?;

    let layout = classify_article_layout(body, &feature_sel);
    let description = match layout {
        ArticleLayout::Standard => {
            stripped_text(require(main, &desc_sel, "article.description")?)
        }
        ArticleLayout::Feature => stripped_text(require(
            main,
            &feature_desc_sel,
            "article.feature_description",
        )?),
    };

    let eyecatch_image = first(main, &eyecatch_sel).and_then(|img| attr(img, "src"));

    let tags = first(root, &tag_list_sel)
        .map(|list| {
            list.select(&tag_link_sel)
                .filter_map(|a| {
                    let name = attr(a, &s.tag_name_attr).unwrap_or_else(|| stripped_text(a));
                    parse_tag(a, name, root_url)
                })
                .collect()
        })
        .unwrap_or_default();

    let artworks = body
        .select(&work_sel)
        .filter_map(|work| match parse_artwork(work, &works) {
            Ok(a) => Some(a),
            Err(e) => {
                tracing::debug!("Skipping article artwork: {e}");
                None
            }
        })
        .collect();

    Ok(ArticleDetail {
        layout,
        title,
        description,
        eyecatch_image,
        artworks,
        tags,
    })
}

struct WorkSelectors {
    user: Selector,
    title: Selector,
    link: Selector,
    image: Selector,
}

fn parse_artwork(
    work: ElementRef<'_>,
    sel: &WorkSelectors,
) -> Result<ArticleArtwork, ExtractionError> {
    // Author and title live in the element just before the work block.
    let info = work
        .prev_siblings()
        .find_map(ElementRef::wrap)
        .ok_or_else(|| ExtractionError::missing("artwork.info"))?;

    let artwork_user = text_of(require(info, &sel.user, "artwork.user")?);
    let artwork_title = text_of(require(info, &sel.title, "artwork.title")?);

    let link = require(work, &sel.link, "artwork.link")?;
    let artwork_url = require_attr(link, "href", "artwork.url")?;
    let artwork_id = parse_id(&artwork_url, MatchMode::Strict)
        .ok_or_else(|| ExtractionError::malformed("artwork.id", artwork_url.as_str()))?;

    let image = require(work, &sel.image, "artwork.image")?;
    let image_url = require_attr(image, "src", "artwork.image_url")?;

    Ok(ArticleArtwork {
        artwork_id,
        artwork_user,
        artwork_title,
        artwork_url,
        image_url,
    })
}

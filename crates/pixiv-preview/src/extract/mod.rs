//! Parse gallery pages into typed entities.
//!
//! Pure functions: no I/O, no clock, identical markup always yields an
//! identical entity. Required anchors that are absent fail the whole record;
//! nested items (users, cards, tags, artworks) are parsed one by one and a
//! broken item is dropped on its own.

pub mod article;
pub mod ranking;
pub mod schema;
pub mod user_search;

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::model::ExtractedEntity;
use crate::types::ExtractionError;

pub use article::{classify_article_layout, parse_article_detail, parse_article_listing};
pub use ranking::parse_ranking_page;
pub use schema::SelectorSchema;
pub use user_search::parse_user_search_page;

/// How an artwork id is located inside a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The whole input must be a single artwork url on the gallery domain.
    Strict,
    /// Any artwork url anywhere inside the input.
    Loose,
}

/// Which url shape carried the artwork id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtworkUrlForm {
    /// `/artworks/{id}` or `/i/{id}`.
    Path,
    /// `...?illust_id={id}`.
    Legacy,
}

/// An artwork id together with the url form it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtworkRef {
    pub id: u64,
    pub form: ArtworkUrlForm,
}

struct IdPatterns {
    strict_path: Regex,
    strict_legacy: Regex,
    loose_path: Regex,
    loose_legacy: Regex,
}

fn id_patterns() -> &'static IdPatterns {
    static PATTERNS: OnceLock<IdPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| IdPatterns {
        strict_path: Regex::new(
            r"^https?://(?:[A-Za-z0-9-]+\.)*pixiv\.net/(?:[a-z]{2}/)?(?:artworks|i)/(\d+)$",
        )
        .expect("static regex"),
        strict_legacy: Regex::new(
            r"^https?://(?:[A-Za-z0-9-]+\.)*pixiv\.net/[^?#\s]*\?(?:[^#\s]*&)?illust_id=(\d+)(?:&mode=\w+)?$",
        )
        .expect("static regex"),
        loose_path: Regex::new(r"https?://\S*?pixiv\.net/(?:[a-z]{2}/)?(?:artworks|i)/(\d+)")
            .expect("static regex"),
        loose_legacy: Regex::new(r"https?://\S*?pixiv\.net\S*?illust_id=(\d+)")
            .expect("static regex"),
    })
}

/// Locate an artwork id, trying the path form before the legacy form.
pub fn parse_artwork_ref(text: &str, mode: MatchMode) -> Option<ArtworkRef> {
    let p = id_patterns();
    let (path, legacy) = match mode {
        MatchMode::Strict => (&p.strict_path, &p.strict_legacy),
        MatchMode::Loose => (&p.loose_path, &p.loose_legacy),
    };

    let capture_id = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
    };

    if let Some(id) = capture_id(path) {
        return Some(ArtworkRef {
            id,
            form: ArtworkUrlForm::Path,
        });
    }
    capture_id(legacy).map(|id| ArtworkRef {
        id,
        form: ArtworkUrlForm::Legacy,
    })
}

/// Artwork id embedded in `text`, if any.
pub fn parse_id(text: &str, mode: MatchMode) -> Option<u64> {
    parse_artwork_ref(text, mode).map(|r| r.id)
}

/// Page types understood by [`extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    UserSearch,
    Ranking { page: u32 },
    ArticleListing,
    ArticleDetail,
}

/// Parse `html` as the given page kind.
///
/// `root_url` absolutises relative article and tag links.
pub fn extract(
    html: &str,
    kind: PageKind,
    root_url: &str,
    schema: &SelectorSchema,
) -> Result<ExtractedEntity, ExtractionError> {
    let entity = match kind {
        PageKind::UserSearch => {
            ExtractedEntity::UserSearch(parse_user_search_page(html, &schema.user_search)?)
        }
        PageKind::Ranking { page } => {
            ExtractedEntity::Ranking(parse_ranking_page(html, page, &schema.ranking)?)
        }
        PageKind::ArticleListing => ExtractedEntity::ArticleListing(parse_article_listing(
            html,
            root_url,
            &schema.article_listing,
        )?),
        PageKind::ArticleDetail => ExtractedEntity::ArticleDetail(parse_article_detail(
            html,
            root_url,
            &schema.article_detail,
        )?),
    };
    Ok(entity)
}

// ─────────────────────── shared helpers ───────────────────────

pub(crate) fn compile(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn first<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

pub(crate) fn require<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    field: &str,
) -> Result<ElementRef<'a>, ExtractionError> {
    first(scope, selector).ok_or_else(|| ExtractionError::missing(field))
}

/// Non-empty attribute value.
pub(crate) fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn require_attr(
    el: ElementRef<'_>,
    name: &str,
    field: &str,
) -> Result<String, ExtractionError> {
    attr(el, name).ok_or_else(|| ExtractionError::missing(field))
}

/// Concatenated text with the outer whitespace trimmed.
pub(crate) fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Every text node trimmed, then joined without separators.
pub(crate) fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

/// Join a site-relative link onto `root_url`.
pub(crate) fn absolutize(root_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    format!("{}{}", root_url.trim_end_matches('/'), href)
}

/// Tag id from a `/{lang}/t/{id}` link; other links are kept whole.
pub(crate) fn tag_id_from_href(href: &str) -> String {
    static TAG_ID: OnceLock<Regex> = OnceLock::new();
    let re = TAG_ID.get_or_init(|| Regex::new(r"^/(?:[a-z-]+/)?t/(\d+)").expect("static regex"));
    re.captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_path_forms() {
        assert_eq!(
            parse_id("https://www.pixiv.net/artworks/12345", MatchMode::Strict),
            Some(12345)
        );
        assert_eq!(
            parse_id("http://pixiv.net/i/42", MatchMode::Strict),
            Some(42)
        );
        assert_eq!(
            parse_id("https://www.pixiv.net/en/artworks/777", MatchMode::Strict),
            Some(777)
        );
    }

    #[test]
    fn test_strict_legacy_forms() {
        let r = parse_artwork_ref(
            "https://www.pixiv.net/member_illust.php?mode=medium&illust_id=98765",
            MatchMode::Strict,
        )
        .unwrap();
        assert_eq!(r.id, 98765);
        assert_eq!(r.form, ArtworkUrlForm::Legacy);

        assert_eq!(
            parse_id(
                "https://www.pixiv.net/member_illust.php?illust_id=98765&mode=medium",
                MatchMode::Strict
            ),
            Some(98765)
        );
    }

    #[test]
    fn test_path_form_preferred() {
        let r = parse_artwork_ref("https://www.pixiv.net/artworks/5", MatchMode::Strict).unwrap();
        assert_eq!(r.form, ArtworkUrlForm::Path);
    }

    #[test]
    fn test_strict_rejects_foreign_domains() {
        assert_eq!(
            parse_id("https://x.example/pixiv.net/artworks/12345", MatchMode::Strict),
            None
        );
        assert_eq!(
            parse_id("https://evilpixiv.net/artworks/1", MatchMode::Strict),
            None
        );
        assert_eq!(
            parse_id("https://www.pixiv.net/artworks/12a", MatchMode::Strict),
            None
        );
        assert_eq!(
            parse_id("see https://www.pixiv.net/artworks/1", MatchMode::Strict),
            None
        );
        assert_eq!(parse_id("not a url", MatchMode::Strict), None);
    }

    #[test]
    fn test_loose_matches_anywhere() {
        assert_eq!(
            parse_id("https://x.example/pixiv.net/artworks/12345", MatchMode::Loose),
            Some(12345)
        );
        assert_eq!(
            parse_id(
                "look at this https://www.pixiv.net/artworks/31337 it's great",
                MatchMode::Loose
            ),
            Some(31337)
        );
        assert_eq!(
            parse_id(
                "old link: https://www.pixiv.net/member_illust.php?illust_id=8&mode=big",
                MatchMode::Loose
            ),
            Some(8)
        );
        assert_eq!(parse_id("no links here", MatchMode::Loose), None);
    }

    #[test]
    fn test_overflowing_id_is_absent() {
        assert_eq!(
            parse_id(
                "https://www.pixiv.net/artworks/99999999999999999999999",
                MatchMode::Strict
            ),
            None
        );
    }

    #[test]
    fn test_tag_id_from_href() {
        assert_eq!(tag_id_from_href("/zh/t/123"), "123");
        assert_eq!(tag_id_from_href("/t/9"), "9");
        assert_eq!(tag_id_from_href("/zh/c/illustration"), "/zh/c/illustration");
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("https://www.pixivision.net/", "/zh/a/1"),
            "https://www.pixivision.net/zh/a/1"
        );
        assert_eq!(absolutize("https://a", "https://b/c"), "https://b/c");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            compile("div[["),
            Err(ExtractionError::InvalidSelector { .. })
        ));
    }
}

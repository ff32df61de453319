//! Ranking listing page.

use scraper::{ElementRef, Html, Selector};

use super::schema::RankingSelectors;
use super::{attr, compile, first, require, require_attr, text_of};
use crate::model::{RankingEntry, RankingPage};
use crate::types::ExtractionError;

/// Parse one page of a ranking listing.
///
/// The ranking container is required; entries missing their id, title,
/// author or thumbnail are skipped. An entry without a rank attribute is
/// ranked by position: `(page - 1) * items_on_page + index + 1`.
pub fn parse_ranking_page(
    html: &str,
    page: u32,
    s: &RankingSelectors,
) -> Result<RankingPage, ExtractionError> {
    let container_sel = compile(&s.container)?;
    let title_sel = compile(&s.title)?;
    let item_sel = compile(&s.item)?;
    let thumb_sel = compile(&s.thumbnail)?;

    let document = Html::parse_document(html);
    let root = document.root_element();

    let container = require(root, &container_sel, "ranking.container")?;
    let title = first(root, &title_sel)
        .map(text_of)
        .filter(|t| !t.is_empty());

    let page = page.max(1);
    let items: Vec<ElementRef<'_>> = container.select(&item_sel).collect();
    let first_rank = (page - 1).saturating_mul(items.len() as u32);

    let entries = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let fallback_rank = first_rank.saturating_add(index as u32 + 1);
            match parse_entry(item, &thumb_sel, s, fallback_rank) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping ranking entry: {e}");
                    None
                }
            }
        })
        .collect();

    Ok(RankingPage {
        title,
        page,
        entries,
    })
}

fn parse_entry(
    item: ElementRef<'_>,
    thumb_sel: &Selector,
    s: &RankingSelectors,
    fallback_rank: u32,
) -> Result<RankingEntry, ExtractionError> {
    let raw_id = require_attr(item, &s.id_attr, "ranking.id")?;
    let illust_id = raw_id
        .parse::<u64>()
        .map_err(|_| ExtractionError::malformed("ranking.id", raw_id.as_str()))?;

    let rank = match attr(item, &s.rank_attr) {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| ExtractionError::malformed("ranking.rank", raw.as_str()))?,
        None => fallback_rank,
    };

    let title = require_attr(item, &s.title_attr, "ranking.title")?;
    let user_name = require_attr(item, &s.user_name_attr, "ranking.user_name")?;

    let thumb = require(item, thumb_sel, "ranking.thumbnail")?;
    let thumbnail_url = require_attr(thumb, &s.thumbnail_attr, "ranking.thumbnail_url")?;

    let user_id = attr(thumb, &s.user_id_attr).and_then(|v| v.parse::<u64>().ok());
    let tags = attr(thumb, &s.tags_attr)
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    let date = attr(item, &s.date_attr);
    let view_count = attr(item, &s.view_count_attr).and_then(|v| v.replace(',', "").parse().ok());

    Ok(RankingEntry {
        rank,
        illust_id,
        title,
        user_name,
        user_id,
        date,
        view_count,
        thumbnail_url,
        url: s.artwork_url_template.replace("{id}", &illust_id.to_string()),
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANKING_HTML: &str = r#"
    <html><body>
    <div class="ranking-header"><h1>Daily ranking</h1></div>
    <div class="ranking-items adjust">
      <section class="ranking-item" data-rank="1" data-id="1001" data-title="Sunset"
               data-user-name="ann" data-date="2024-01-01" data-view-count="1,234">
        <img class="_thumbnail ui-scroll-view" data-src="https://i.pximg.net/c/1001.jpg"
             data-user-id="7" data-tags="sky sunset">
      </section>
      <section class="ranking-item" data-rank="2" data-id="not-a-number" data-title="Broken"
               data-user-name="bob">
        <img class="_thumbnail" data-src="https://i.pximg.net/c/x.jpg">
      </section>
      <section class="ranking-item" data-rank="3" data-id="1003" data-title="Forest"
               data-user-name="cat">
        <img class="_thumbnail" data-src="https://i.pximg.net/c/1003.jpg">
      </section>
    </div>
    </body></html>
    "#;

    #[test]
    fn test_parse_ranking() {
        let page = parse_ranking_page(RANKING_HTML, 2, &RankingSelectors::default()).unwrap();
        assert_eq!(page.title.as_deref(), Some("Daily ranking"));
        assert_eq!(page.page, 2);
        assert_eq!(page.entries.len(), 2);

        let first = &page.entries[0];
        assert_eq!(first.rank, 1);
        assert_eq!(first.illust_id, 1001);
        assert_eq!(first.user_id, Some(7));
        assert_eq!(first.view_count, Some(1234));
        assert_eq!(first.tags, vec!["sky", "sunset"]);
        assert_eq!(first.url, "https://www.pixiv.net/artworks/1001");

        assert_eq!(page.entries[1].illust_id, 1003);
        assert_eq!(page.entries[1].date, None);
    }

    #[test]
    fn test_missing_container() {
        let err = parse_ranking_page("<html></html>", 1, &RankingSelectors::default()).unwrap_err();
        assert_eq!(err, ExtractionError::missing("ranking.container"));
    }

    #[test]
    fn test_rank_from_position_when_attribute_absent() {
        let html = RANKING_HTML
            .replace(r#"data-rank="1" "#, "")
            .replace(r#"data-rank="3" "#, "");
        let page = parse_ranking_page(&html, 2, &RankingSelectors::default()).unwrap();
        // Three items per page, so page 2 starts at rank 4.
        let ranks: Vec<u32> = page.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![4, 6]);

        let page = parse_ranking_page(&html, 1, &RankingSelectors::default()).unwrap();
        let ranks: Vec<u32> = page.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 3]);
    }

    #[test]
    fn test_malformed_rank_skips_entry() {
        let html = RANKING_HTML.replace(r#"data-rank="1""#, r#"data-rank="first""#);
        let page = parse_ranking_page(&html, 1, &RankingSelectors::default()).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].illust_id, 1003);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let page = parse_ranking_page(RANKING_HTML, 0, &RankingSelectors::default()).unwrap();
        assert_eq!(page.page, 1);
    }
}

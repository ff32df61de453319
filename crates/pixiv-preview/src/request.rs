//! Batch preview requests: bounded concurrent fetches with partial failure.
//!
//! Every request owns its own result slot. At most `limit` fetches are in
//! flight at once, and results come back in input order no matter which
//! fetch finishes first. A failed fetch only empties its own slot.

use std::fmt::Display;

use futures::stream::{self, StreamExt};

use crate::fetch::ResourceFetcher;
use crate::model::{
    ArticleDetail, ArticleListing, ArtworkSearchResult, ExtractedEntity, RankingPage,
    UserSearchPage,
};
use crate::types::{PreviewBatch, PreviewItem, PreviewRequest};

/// Characters kept from a title or author line before it is cut.
pub const DEFAULT_DESC_LIMIT: usize = 13;

/// Fetch every request, at most `limit` at a time.
///
/// The result has one item per request in the same order; failed fetches
/// leave `image_bytes` empty.
pub async fn fetch_slots(
    fetcher: &dyn ResourceFetcher,
    requests: Vec<PreviewRequest>,
    limit: usize,
) -> Vec<PreviewItem> {
    stream::iter(requests)
        .map(|request| async move {
            let image_bytes = match fetcher.fetch(&request.url, &[]).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!("Preview fetch failed for {}: {e}", request.url);
                    None
                }
            };
            PreviewItem {
                description: request.description,
                source_url: request.url,
                image_bytes,
            }
        })
        .buffered(limit.max(1))
        .collect()
        .await
}

/// Fetch raw resources positionally, at most `limit` at a time.
pub async fn fetch_urls(
    fetcher: &dyn ResourceFetcher,
    urls: &[String],
    limit: usize,
) -> Vec<Option<Vec<u8>>> {
    let requests = urls
        .iter()
        .map(|url| PreviewRequest::new(String::new(), url.as_str()))
        .collect();
    fetch_slots(fetcher, requests, limit)
        .await
        .into_iter()
        .map(|item| item.image_bytes)
        .collect()
}

/// Fetch a named batch, keeping only the successes in input order.
pub async fn request_preview_batch(
    fetcher: &dyn ResourceFetcher,
    name: &str,
    requests: Vec<PreviewRequest>,
    limit: usize,
) -> PreviewBatch {
    let requested = requests.len();
    let slots = fetch_slots(fetcher, requests, limit).await;
    let batch = PreviewBatch::new(name, slots);
    tracing::info!(
        "Preview batch {name:?}: {} of {requested} fetched",
        batch.count()
    );
    batch
}

/// Three-line caption: id, title and author, long lines cut at `limit`
/// characters with `...` appended.
pub fn format_artwork_preview_desc(
    pid: impl Display,
    title: &str,
    uname: &str,
    limit: usize,
) -> String {
    let author = format!("Author: {uname}");
    format!(
        "Pid: {pid}\n{}\n{}",
        truncate_chars(title, limit),
        truncate_chars(&author, limit)
    )
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub fn preview_requests_from_ranking(page: &RankingPage) -> Vec<PreviewRequest> {
    page.entries
        .iter()
        .map(|entry| {
            let title = format!("【No.{}】{}", entry.rank, entry.title);
            PreviewRequest::new(
                format_artwork_preview_desc(
                    entry.illust_id,
                    &title,
                    &entry.user_name,
                    DEFAULT_DESC_LIMIT,
                ),
                entry.thumbnail_url.as_str(),
            )
        })
        .collect()
}

/// One request per artwork search hit, in result order.
pub fn preview_requests_from_artwork_search(
    results: &[ArtworkSearchResult],
) -> Vec<PreviewRequest> {
    results
        .iter()
        .map(|art| {
            PreviewRequest::new(
                format_artwork_preview_desc(
                    art.id,
                    &art.title,
                    &art.user_name,
                    DEFAULT_DESC_LIMIT,
                ),
                art.thumbnail_url.as_str(),
            )
        })
        .collect()
}

pub fn preview_requests_from_listing(listing: &ArticleListing) -> Vec<PreviewRequest> {
    listing
        .articles
        .iter()
        .map(|card| {
            PreviewRequest::new(
                format!("ArticleID: {}\n{}", card.article_id, card.title),
                card.thumbnail_url.as_str(),
            )
        })
        .collect()
}

pub fn preview_requests_from_detail(detail: &ArticleDetail) -> Vec<PreviewRequest> {
    detail
        .artworks
        .iter()
        .map(|art| {
            PreviewRequest::new(
                format_artwork_preview_desc(
                    art.artwork_id,
                    &art.artwork_title,
                    &art.artwork_user,
                    DEFAULT_DESC_LIMIT,
                ),
                art.image_url.as_str(),
            )
        })
        .collect()
}

/// One request per user avatar.
pub fn preview_requests_from_user_search(page: &UserSearchPage) -> Vec<PreviewRequest> {
    page.users
        .iter()
        .map(|user| {
            PreviewRequest::new(
                format!("{}\nUID: {}", user.user_name, user.user_id),
                user.avatar_url.as_str(),
            )
        })
        .collect()
}

/// Requests for any extracted entity.
pub fn preview_requests_from_entity(entity: &ExtractedEntity) -> Vec<PreviewRequest> {
    match entity {
        ExtractedEntity::UserSearch(page) => preview_requests_from_user_search(page),
        ExtractedEntity::Ranking(page) => preview_requests_from_ranking(page),
        ExtractedEntity::ArticleListing(listing) => preview_requests_from_listing(listing),
        ExtractedEntity::ArticleDetail(detail) => preview_requests_from_detail(detail),
    }
}

pub fn preview_requests_from_pairs<I, D, U>(pairs: I) -> Vec<PreviewRequest>
where
    I: IntoIterator<Item = (D, U)>,
    D: Into<String>,
    U: Into<String>,
{
    pairs
        .into_iter()
        .map(|(description, url)| PreviewRequest::new(description, url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArticleArtwork, ArticleCard, ArticleLayout, RankingEntry};
    use crate::types::FetchError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Serves the url itself as bytes unless it is listed as failing.
    /// Later urls answer sooner so completion order is reversed.
    struct EchoFetcher {
        failing: HashSet<String>,
    }

    #[async_trait]
    impl ResourceFetcher for EchoFetcher {
        async fn fetch(
            &self,
            url: &str,
            _params: &[(String, String)],
        ) -> Result<Vec<u8>, FetchError> {
            let n: u64 = url.rsplit('/').next().and_then(|s| s.parse().ok()).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(50u64.saturating_sub(n * 10))).await;
            if self.failing.contains(url) {
                return Err(FetchError::Network {
                    status: 404,
                    url: url.to_string(),
                });
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    fn requests(n: usize) -> Vec<PreviewRequest> {
        (1..=n)
            .map(|i| PreviewRequest::new(format!("item {i}"), format!("https://i.example/{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_batch_drops_failures_in_order() {
        let fetcher = EchoFetcher {
            failing: ["https://i.example/3".to_string()].into_iter().collect(),
        };
        let batch = request_preview_batch(&fetcher, "demo", requests(5), 10).await;
        let order: Vec<&str> = batch.items().iter().map(|i| i.description.as_str()).collect();
        assert_eq!(order, vec!["item 1", "item 2", "item 4", "item 5"]);
        assert_eq!(batch.count(), 4);
    }

    #[tokio::test]
    async fn test_slots_keep_failures_positionally() {
        let fetcher = EchoFetcher {
            failing: ["https://i.example/2".to_string()].into_iter().collect(),
        };
        let urls: Vec<String> = (1..=3).map(|i| format!("https://i.example/{i}")).collect();
        let slots = fetch_urls(&fetcher, &urls, 2).await;
        assert_eq!(slots.len(), 3);
        assert!(slots[0].is_some());
        assert!(slots[1].is_none());
        assert_eq!(slots[2].as_deref(), Some(urls[2].as_bytes()));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let fetcher = EchoFetcher {
            failing: HashSet::new(),
        };
        let batch = request_preview_batch(&fetcher, "none", Vec::new(), 0).await;
        assert!(batch.is_empty());
        assert_eq!(batch.name(), "none");
    }

    #[test]
    fn test_format_desc_truncates() {
        assert_eq!(
            format_artwork_preview_desc(1, "short", "ann", 13),
            "Pid: 1\nshort\nAuthor: ann"
        );
        assert_eq!(
            format_artwork_preview_desc(2, "a title far too long", "someone long", 13),
            "Pid: 2\na title far t...\nAuthor: someo..."
        );
        // Counted in characters, not bytes.
        assert_eq!(
            format_artwork_preview_desc(3, "夕焼けの空と海と山と川と森", "x", 5),
            "Pid: 3\n夕焼けの空...\nAutho..."
        );
    }

    #[test]
    fn test_ranking_requests() {
        let page = RankingPage {
            title: None,
            page: 1,
            entries: vec![RankingEntry {
                rank: 4,
                illust_id: 99,
                title: "Sky".into(),
                user_name: "ann".into(),
                user_id: None,
                date: None,
                view_count: None,
                thumbnail_url: "https://i.pximg.net/99.jpg".into(),
                url: "https://www.pixiv.net/artworks/99".into(),
                tags: vec![],
            }],
        };
        let reqs = preview_requests_from_ranking(&page);
        assert_eq!(reqs[0].url, "https://i.pximg.net/99.jpg");
        assert_eq!(reqs[0].description, "Pid: 99\n【No.4】Sky\nAuthor: ann");
    }

    #[test]
    fn test_artwork_search_requests() {
        let results: Vec<ArtworkSearchResult> = serde_json::from_str(
            r#"[
                {"id": 101, "title": "Harbour lights at dusk", "userName": "mio", "url": "https://i.pximg.net/101.jpg"},
                {"id": 7, "title": "Fox", "userName": "ren", "url": "https://i.pximg.net/7.jpg"}
            ]"#,
        )
        .unwrap();
        let reqs = preview_requests_from_artwork_search(&results);
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].description, "Pid: 101\nHarbour light...\nAuthor: mio");
        assert_eq!(reqs[0].url, "https://i.pximg.net/101.jpg");
        assert_eq!(
            reqs[1],
            PreviewRequest::new("Pid: 7\nFox\nAuthor: ren", "https://i.pximg.net/7.jpg")
        );
        assert!(preview_requests_from_artwork_search(&[]).is_empty());
    }

    #[test]
    fn test_article_requests() {
        let listing = ArticleListing {
            articles: vec![ArticleCard {
                article_id: "7".into(),
                title: "Cats".into(),
                thumbnail_url: "https://t/7.jpg".into(),
                url: "https://www.pixivision.net/a/7".into(),
                tags: vec![],
            }],
        };
        let reqs = preview_requests_from_entity(&ExtractedEntity::ArticleListing(listing));
        assert_eq!(reqs, vec![PreviewRequest::new("ArticleID: 7\nCats", "https://t/7.jpg")]);

        let detail = ArticleDetail {
            layout: ArticleLayout::Standard,
            title: "t".into(),
            description: "d".into(),
            eyecatch_image: None,
            artworks: vec![ArticleArtwork {
                artwork_id: 5,
                artwork_user: "bob".into(),
                artwork_title: "Moon".into(),
                artwork_url: "https://www.pixiv.net/artworks/5".into(),
                image_url: "https://i/5.jpg".into(),
            }],
            tags: vec![],
        };
        let reqs = preview_requests_from_detail(&detail);
        assert_eq!(reqs[0].description, "Pid: 5\nMoon\nAuthor: bob");
        assert_eq!(reqs[0].url, "https://i/5.jpg");
    }

    #[test]
    fn test_pairs() {
        let reqs = preview_requests_from_pairs([("a", "https://x/a"), ("b", "https://x/b")]);
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1], PreviewRequest::new("b", "https://x/b"));
    }
}

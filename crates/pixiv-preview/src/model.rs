//! Typed entities recovered from gallery pages.

use serde::{Deserialize, Serialize};

/// Any entity the extractor can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractedEntity {
    UserSearch(UserSearchPage),
    Ranking(RankingPage),
    ArticleListing(ArticleListing),
    ArticleDetail(ArticleDetail),
}

/// A user search results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearchPage {
    pub search_name: String,
    pub count: String,
    pub users: Vec<UserSearchResult>,
}

/// One user card on the search results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearchResult {
    pub user_id: String,
    pub user_name: String,
    pub avatar_url: String,
    pub illust_count: Option<String>,
    pub description: String,
    pub thumbnail_urls: Vec<String>,
}

/// A ranking listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingPage {
    pub title: Option<String>,
    pub page: u32,
    pub entries: Vec<RankingEntry>,
}

/// One ranked artwork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: u32,
    pub illust_id: u64,
    pub title: String,
    pub user_name: String,
    pub user_id: Option<u64>,
    pub date: Option<String>,
    pub view_count: Option<u64>,
    pub thumbnail_url: String,
    pub url: String,
    pub tags: Vec<String>,
}

/// A tag attached to an article card or article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleTag {
    pub tag_id: String,
    pub tag_name: String,
    pub tag_url: String,
}

/// An article listing (showcase) page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleListing {
    pub articles: Vec<ArticleCard>,
}

/// One article card on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleCard {
    pub article_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub url: String,
    pub tags: Vec<ArticleTag>,
}

/// Structural variant of an article page, resolved by probing the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleLayout {
    Standard,
    Feature,
}

/// A single article page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub layout: ArticleLayout,
    pub title: String,
    pub description: String,
    pub eyecatch_image: Option<String>,
    pub artworks: Vec<ArticleArtwork>,
    pub tags: Vec<ArticleTag>,
}

/// An artwork featured inside an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleArtwork {
    pub artwork_id: u64,
    pub artwork_user: String,
    pub artwork_title: String,
    pub artwork_url: String,
    pub image_url: String,
}

/// One artwork in a search result list, as the search API returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkSearchResult {
    pub id: u64,
    pub title: String,
    pub user_name: String,
    /// Thumbnail address.
    #[serde(rename = "url")]
    pub thumbnail_url: String,
}

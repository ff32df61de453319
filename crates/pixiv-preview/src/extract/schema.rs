//! Versioned selector schema for every supported page type.
//!
//! Page markup changes are absorbed by shipping a new schema value; the
//! parsers only ever see selectors and attribute names from here.

use serde::{Deserialize, Serialize};

/// Version of the built-in schema.
pub const SCHEMA_VERSION: u32 = 1;

/// All selectors the extractor needs, grouped by page type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorSchema {
    pub version: u32,
    pub user_search: UserSearchSelectors,
    pub ranking: RankingSelectors,
    pub article_listing: ArticleListingSelectors,
    pub article_detail: ArticleDetailSelectors,
}

impl Default for SelectorSchema {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            user_search: UserSearchSelectors::default(),
            ranking: RankingSelectors::default(),
            article_listing: ArticleListingSelectors::default(),
            article_detail: ArticleDetailSelectors::default(),
        }
    }
}

impl SelectorSchema {
    /// Load a schema from JSON; missing groups fall back to the built-in ones.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSearchSelectors {
    pub header: String,
    pub title: String,
    pub count: String,
    pub user_item: String,
    pub avatar: String,
    pub avatar_attr: String,
    pub name_link: String,
    /// Prefix stripped from the profile link to leave the user id.
    pub user_href_prefix: String,
    pub illust_count: String,
    pub description: String,
    pub thumbnail: String,
    pub thumbnail_attr: String,
}

impl Default for UserSearchSelectors {
    fn default() -> Self {
        Self {
            header: "div.column-header".into(),
            title: "h1.column-title".into(),
            count: "span.count-badge".into(),
            user_item: "li.user-recommendation-item".into(),
            avatar: "a._user-icon".into(),
            avatar_attr: "data-src".into(),
            name_link: "h1 > a".into(),
            user_href_prefix: "/users/".into(),
            illust_count: "dl.meta.inline-list dd a".into(),
            description: "p.caption".into(),
            thumbnail: "li.action-open-thumbnail a".into(),
            thumbnail_attr: "data-src".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSelectors {
    pub container: String,
    pub title: String,
    pub item: String,
    pub id_attr: String,
    pub rank_attr: String,
    pub title_attr: String,
    pub user_name_attr: String,
    pub date_attr: String,
    pub view_count_attr: String,
    pub thumbnail: String,
    pub thumbnail_attr: String,
    pub user_id_attr: String,
    pub tags_attr: String,
    /// Artwork page url; `{id}` is replaced with the artwork id.
    pub artwork_url_template: String,
}

impl Default for RankingSelectors {
    fn default() -> Self {
        Self {
            container: "div.ranking-items".into(),
            title: "div.ranking-header h1".into(),
            item: "section.ranking-item".into(),
            id_attr: "data-id".into(),
            rank_attr: "data-rank".into(),
            title_attr: "data-title".into(),
            user_name_attr: "data-user-name".into(),
            date_attr: "data-date".into(),
            view_count_attr: "data-view-count".into(),
            thumbnail: "img._thumbnail".into(),
            thumbnail_attr: "data-src".into(),
            user_id_attr: "data-user-id".into(),
            tags_attr: "data-tags".into(),
            artwork_url_template: "https://www.pixiv.net/artworks/{id}".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleListingSelectors {
    pub card: String,
    pub title_link: String,
    pub id_attr: String,
    pub thumbnail: String,
    pub thumbnail_style_attr: String,
    pub tag_item: String,
    pub tag_link: String,
}

impl Default for ArticleListingSelectors {
    fn default() -> Self {
        Self {
            card: "li.article-card-container".into(),
            title_link: "h2.arc__title a".into(),
            id_attr: "data-gtm-label".into(),
            thumbnail: "div._thumbnail".into(),
            thumbnail_style_attr: "style".into(),
            tag_item: "ul._tag-list li".into(),
            tag_link: "a".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleDetailSelectors {
    pub main: String,
    pub title: String,
    pub description: String,
    pub eyecatch_image: String,
    pub tag_list: String,
    pub tag_link: String,
    pub tag_name_attr: String,
    pub body: String,
    /// Presence of this container inside the body marks the feature layout.
    pub feature_body: String,
    pub feature_description: String,
    pub work_main: String,
    pub work_user: String,
    pub work_title: String,
    pub work_link: String,
    pub work_image: String,
}

impl Default for ArticleDetailSelectors {
    fn default() -> Self {
        Self {
            main: "div._article-main".into(),
            title: "h1.am__title".into(),
            description: "div.am__description._medium-editor-text".into(),
            eyecatch_image: "div._article-illust-eyecatch img".into(),
            tag_list: "ul._tag-list".into(),
            tag_link: "a".into(),
            tag_name_attr: "data-gtm-label".into(),
            body: "div.am__body".into(),
            feature_body: "div._feature-article-body".into(),
            feature_description: "div.fab__paragraph._medium-editor-text".into(),
            work_main: "div.am__work__main".into(),
            work_user: "p.am__work__user-name a.author-img-container".into(),
            work_title: "h3.am__work__title".into(),
            work_link: "a.inner-link".into(),
            work_image: "img.am__work__illust".into(),
        }
    }
}

//! User search results page.

use scraper::{ElementRef, Html, Selector};

use super::schema::UserSearchSelectors;
use super::{attr, compile, first, require, require_attr, text_of};
use crate::model::{UserSearchPage, UserSearchResult};
use crate::types::ExtractionError;

struct Compiled {
    header: Selector,
    title: Selector,
    count: Selector,
    user_item: Selector,
    avatar: Selector,
    name_link: Selector,
    illust_count: Selector,
    description: Selector,
    thumbnail: Selector,
}

impl Compiled {
    fn new(s: &UserSearchSelectors) -> Result<Self, ExtractionError> {
        Ok(Self {
            header: compile(&s.header)?,
            title: compile(&s.title)?,
            count: compile(&s.count)?,
            user_item: compile(&s.user_item)?,
            avatar: compile(&s.avatar)?,
            name_link: compile(&s.name_link)?,
            illust_count: compile(&s.illust_count)?,
            description: compile(&s.description)?,
            thumbnail: compile(&s.thumbnail)?,
        })
    }
}

/// Parse a user search results page.
///
/// The header (search name and result count) is required. A user entry
/// lacking its id, name or avatar is skipped.
pub fn parse_user_search_page(
    html: &str,
    selectors: &UserSearchSelectors,
) -> Result<UserSearchPage, ExtractionError> {
    let c = Compiled::new(selectors)?;
    let document = Html::parse_document(html);
    let root = document.root_element();

    let header = require(root, &c.header, "user_search.header")?;
    let search_name = text_of(require(header, &c.title, "user_search.title")?);
    let count = text_of(require(header, &c.count, "user_search.count")?);

    let users = root
        .select(&c.user_item)
        .filter_map(|item| match parse_user(item, &c, selectors) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!("Skipping user search entry: {e}");
                None
            }
        })
        .collect();

    Ok(UserSearchPage {
        search_name,
        count,
        users,
    })
}

fn parse_user(
    item: ElementRef<'_>,
    c: &Compiled,
    s: &UserSearchSelectors,
) -> Result<UserSearchResult, ExtractionError> {
    let avatar = require(item, &c.avatar, "user.avatar")?;
    let avatar_url = require_attr(avatar, &s.avatar_attr, "user.avatar_url")?;

    let name_link = require(item, &c.name_link, "user.name")?;
    let user_name = text_of(name_link);
    if user_name.is_empty() {
        return Err(ExtractionError::missing("user.name"));
    }
    let href = require_attr(name_link, "href", "user.href")?;
    let user_id = href.replace(s.user_href_prefix.as_str(), "");
    if user_id.is_empty() || !user_id.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ExtractionError::malformed("user.id", href));
    }

    let illust_count = first(item, &c.illust_count)
        .map(text_of)
        .filter(|t| !t.is_empty());

    let description = first(item, &c.description)
        .map(|el| {
            el.text()
                .collect::<String>()
                .replace("\r\n", " ")
                .replace('\n', " ")
        })
        .unwrap_or_default();

    let thumbnail_urls = item
        .select(&c.thumbnail)
        .filter_map(|a| attr(a, &s.thumbnail_attr))
        .collect();

    Ok(UserSearchResult {
        user_id,
        user_name,
        avatar_url,
        illust_count,
        description,
        thumbnail_urls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_li(id: &str, name: &str, avatar: Option<&str>) -> String {
        let avatar = avatar
            .map(|a| format!(r#"<a class="_user-icon size-128 cover-texture" data-src="{a}" title="{name}"></a>"#))
            .unwrap_or_default();
        format!(
            r#"<li class="user-recommendation-item">
                {avatar}
                <h1><a href="/users/{id}">{name}</a></h1>
                <dl class="meta inline-list"><dt>Works</dt><dd><a href="/users/{id}/artworks">57</a></dd></dl>
                <p class="caption">hello{crlf}world</p>
                <ul>
                  <li class="action-open-thumbnail"><a data-src="https://i.pximg.net/t/{id}_1.jpg"></a></li>
                  <li class="action-open-thumbnail"><a></a></li>
                  <li class="action-open-thumbnail"><a data-src="https://i.pximg.net/t/{id}_2.jpg"></a></li>
                </ul>
            </li>"#,
            crlf = "\r\n"
        )
    }

    fn page(body: &str) -> String {
        format!(
            r#"<html><body>
            <div class="column-header"><h1 class="column-title">miku</h1><span class="count-badge">120</span></div>
            <ul>{body}</ul>
            </body></html>"#
        )
    }

    #[test]
    fn test_parse_users() {
        let html = page(&format!(
            "{}{}",
            user_li("11", "Alice", Some("https://i.pximg.net/a/11.png")),
            user_li("22", "Bob", Some("https://i.pximg.net/a/22.png"))
        ));
        let result = parse_user_search_page(&html, &UserSearchSelectors::default()).unwrap();
        assert_eq!(result.search_name, "miku");
        assert_eq!(result.count, "120");
        assert_eq!(result.users.len(), 2);

        let alice = &result.users[0];
        assert_eq!(alice.user_id, "11");
        assert_eq!(alice.user_name, "Alice");
        assert_eq!(alice.avatar_url, "https://i.pximg.net/a/11.png");
        assert_eq!(alice.illust_count.as_deref(), Some("57"));
        assert_eq!(alice.thumbnail_urls.len(), 2);
        assert_eq!(alice.description, "hello world");
    }

    #[test]
    fn test_user_without_avatar_is_dropped() {
        let html = page(&format!(
            "{}{}",
            user_li("11", "Alice", None),
            user_li("22", "Bob", Some("https://i.pximg.net/a/22.png"))
        ));
        let result = parse_user_search_page(&html, &UserSearchSelectors::default()).unwrap();
        assert_eq!(result.users.len(), 1);
        assert_eq!(result.users[0].user_name, "Bob");
    }

    #[test]
    fn test_missing_header_fails() {
        let html = "<html><body><ul></ul></body></html>";
        let err = parse_user_search_page(html, &UserSearchSelectors::default()).unwrap_err();
        assert_eq!(err, ExtractionError::missing("user_search.header"));
    }

    #[test]
    fn test_idempotent() {
        let html = page(&user_li("11", "Alice", Some("https://i.pximg.net/a/11.png")));
        let a = parse_user_search_page(&html, &UserSearchSelectors::default()).unwrap();
        let b = parse_user_search_page(&html, &UserSearchSelectors::default()).unwrap();
        assert_eq!(a, b);
    }
}

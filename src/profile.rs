use scraper::Html;
use tracing::{debug, warn};

use crate::dom::{sel, text_of};
use crate::fetch::Fetcher;
use crate::names;

/// Canonical location of a player's page on the stats site.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRef {
    pub url: String,
    pub display_name: String,
    pub team: Option<String>,
}

/// Resolve a player name to a profile URL via the site's player search.
///
/// Selection policy: first result whose normalized display name contains the
/// normalized query, else the first result at all (best effort), else None.
/// A network failure also yields None; the caller treats it as a terminal,
/// reportable condition for that player, never a retry.
pub fn resolve_profile(fetcher: &Fetcher, player: &str) -> Option<ProfileRef> {
    let search_url = format!("{}/search/", fetcher.base_url());
    let doc = match fetcher.get_html_with_query(&search_url, &[("q", player), ("type", "players")])
    {
        Ok(doc) => doc,
        Err(err) => {
            warn!(player, error = %err, "player search failed");
            return None;
        }
    };
    let hit = select_search_hit(&doc, player)?;
    debug!(player, url = %hit.href, "resolved player profile");
    Some(ProfileRef {
        url: fetcher.absolute(&hit.href),
        display_name: hit.title,
        team: None,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub href: String,
    pub title: String,
}

/// Pure result-list parse, exposed for fixture tests.
pub fn parse_search_results(doc: &Html) -> Vec<SearchHit> {
    let item_sel = sel("a.wf-module-item.search-item");
    let title_sel = sel("div.search-item-title");
    doc.root_element()
        .select(&item_sel)
        .filter_map(|item| {
            let href = item.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let title = item
                .select(&title_sel)
                .next()
                .map(|t| text_of(&t))
                .unwrap_or_default();
            Some(SearchHit {
                href: player_href(href),
                title,
            })
        })
        .collect()
}

pub fn select_search_hit(doc: &Html, query: &str) -> Option<SearchHit> {
    let hits = parse_search_results(doc);
    let normalized_query = names::normalize(query);
    hits.iter()
        .find(|hit| names::normalize(&hit.title).contains(&normalized_query))
        .cloned()
        .or_else(|| hits.first().cloned())
}

/// Some search results wrap the profile path in a redirect; keep only the
/// direct `/player/...` part when present.
fn player_href(href: &str) -> String {
    if href.starts_with("/player/") {
        return href.to_string();
    }
    if let Some((_, tail)) = href.split_once("/player/") {
        return format!("/player/{tail}");
    }
    href.to_string()
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::{parse_search_results, player_href, select_search_hit};

    const SEARCH_PAGE: &str = r#"
        <div class="wf-card">
          <a class="wf-module-item search-item" href="/player/123/tenz">
            <div class="search-item-title">TenZ</div>
          </a>
          <a class="wf-module-item search-item" href="/player/456/tenzo">
            <div class="search-item-title">Tenzo</div>
          </a>
        </div>"#;

    #[test]
    fn parses_all_search_items() {
        let doc = Html::parse_document(SEARCH_PAGE);
        let hits = parse_search_results(&doc);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].href, "/player/123/tenz");
        assert_eq!(hits[0].title, "TenZ");
    }

    #[test]
    fn prefers_containing_hit_over_first() {
        let doc = Html::parse_document(SEARCH_PAGE);
        let hit = select_search_hit(&doc, "tenzo").expect("hit");
        assert_eq!(hit.href, "/player/456/tenzo");
    }

    #[test]
    fn falls_back_to_first_result() {
        let doc = Html::parse_document(SEARCH_PAGE);
        let hit = select_search_hit(&doc, "completely-different").expect("hit");
        assert_eq!(hit.href, "/player/123/tenz");
    }

    #[test]
    fn empty_results_resolve_to_none() {
        let doc = Html::parse_document("<div></div>");
        assert!(select_search_hit(&doc, "anyone").is_none());
    }

    #[test]
    fn redirect_hrefs_are_unwrapped() {
        assert_eq!(player_href("/search/go?to=/player/9/ace"), "/player/9/ace");
        assert_eq!(player_href("/player/9/ace"), "/player/9/ace");
    }
}

use std::collections::HashMap;

use chrono::NaiveDate;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::dom::{sel, select_first, text_of};
use crate::fetch::Fetcher;
use crate::history;
use crate::names;

/// A player's current team as listed on their profile page.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamRef {
    pub name: String,
    pub url: Option<String>,
}

/// Locate the "Current Teams" section heading on a profile document and read
/// the first listed team. Returns None when the player is teamless or the
/// section is missing.
pub fn current_team(doc: &Html, base_url: &str) -> Option<TeamRef> {
    let heading_sel = sel("h2");
    let heading = doc
        .root_element()
        .select(&heading_sel)
        .find(|h2| text_of(h2).contains("Current Teams"))?;
    let card = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().has_class("wf-card", scraper::CaseSensitivity::AsciiCaseInsensitive))?;
    let link = select_first(&card, &["a.wf-module-item"])?;

    let name_div = select_first(&link, &[r#"div[style*="font-weight: 500"]"#]);
    let name = name_div.map(|d| text_of(&d)).unwrap_or_else(|| text_of(&link));
    if name.is_empty() {
        return None;
    }
    let url = link
        .value()
        .attr("href")
        .filter(|href| !href.is_empty())
        .map(|href| absolute_href(base_url, href));
    Some(TeamRef { name, url })
}

fn absolute_href(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{href}", base_url.trim_end_matches('/'))
    }
}

/// Find the next match a team plays. Candidate links are harvested from the
/// team page in document order; each candidate is classified by a heuristic
/// chain: an explicit date on or after `today` means upcoming, an undated
/// page without completed stat tables means upcoming, and an undated page
/// with tables is held as a last-resort candidate. Returns the first
/// qualifying match URL.
pub fn upcoming_match_for_team(fetcher: &Fetcher, team_url: &str, today: NaiveDate) -> Option<String> {
    let doc = match fetcher.get_html(team_url) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(team_url, error = %err, "team page fetch failed");
            return None;
        }
    };
    let candidates = history::extract_match_links(&doc, fetcher.base_url());
    let mut undated_fallback: Option<String> = None;

    for url in &candidates {
        let match_doc = match fetcher.get_html(url) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(url, error = %err, "match candidate fetch failed");
                continue;
            }
        };
        match history::match_day(&match_doc) {
            Some(day) if day >= today => {
                debug!(url, %day, "found dated upcoming match");
                return Some(url.clone());
            }
            Some(_) => continue,
            None => {
                if !history::has_stat_tables(&match_doc) {
                    debug!(url, "undated match without stats, treating as upcoming");
                    return Some(url.clone());
                }
                if undated_fallback.is_none() {
                    undated_fallback = Some(url.clone());
                }
            }
        }
    }

    // Unknown matches are assumed upcoming rather than dropped.
    undated_fallback.or_else(|| candidates.first().cloned())
}

/// A player's profile link discovered on a match page, keyed by normalized
/// name in [`MatchRoster::players`].
#[derive(Debug, Clone, PartialEq)]
pub struct RosterLink {
    pub url: String,
    pub display_name: String,
    pub team: Option<String>,
}

/// Everything a match page tells us about who is playing: the two team
/// names and a profile link per rostered player.
#[derive(Debug, Clone, Default)]
pub struct MatchRoster {
    pub teams: Vec<String>,
    pub players: HashMap<String, RosterLink>,
}

pub fn fetch_match_roster(fetcher: &Fetcher, match_url: &str) -> Option<MatchRoster> {
    match fetcher.get_html(match_url) {
        Ok(doc) => Some(parse_match_roster(&doc, fetcher.base_url())),
        Err(err) => {
            warn!(match_url, error = %err, "match roster fetch failed");
            None
        }
    }
}

/// Pure roster parse. Within each map section the first stat table belongs
/// to the first header team and the second table to the other; that pairing
/// assigns a team to each player link.
pub fn parse_match_roster(doc: &Html, base_url: &str) -> MatchRoster {
    let teams = history::match_teams(doc);
    let mut players: HashMap<String, RosterLink> = HashMap::new();

    let section_sel = sel("div.vm-stats-game");
    let table_sel = sel("table.wf-table-inset, table.wf-table");
    let row_sel = sel("tbody tr");
    let link_sel = sel("a[href*='/player/']");

    for section in doc.root_element().select(&section_sel) {
        for (table_idx, table) in section.select(&table_sel).enumerate() {
            let team = teams.get(table_idx.min(1)).cloned();
            for row in table.select(&row_sel) {
                let Some(link) = row.select(&link_sel).next() else {
                    continue;
                };
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                let cell = select_first(&row, &["td.mod-player div.text-of", "td.mod-player"]);
                let display_name = cell
                    .as_ref()
                    .and_then(|c| c.value().attr("title"))
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .or_else(|| cell.as_ref().map(text_of))
                    .unwrap_or_else(|| text_of(&link));
                let key = names::normalize(&display_name);
                if key.is_empty() {
                    continue;
                }
                players.entry(key).or_insert_with(|| RosterLink {
                    url: absolute_href(base_url, href),
                    display_name,
                    team: team.clone(),
                });
            }
        }
    }

    MatchRoster { teams, players }
}

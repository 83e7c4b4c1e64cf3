use chrono::{NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::dom::{sel, select_all, select_first, text_of};
use crate::error::PlayerError;
use crate::fetch::Fetcher;
use crate::names;

pub const UNKNOWN_DATE: &str = "<Unknown Date>";
pub const UNKNOWN_MATCH: &str = "<Unknown Match>";
pub const UNKNOWN_AGENT: &str = "<Unknown Agent>";

/// Minimum digit count for a leading numeric path segment to count as a
/// match id; shorter numbers are pagination and anchor links.
const MATCH_ID_MIN_DIGITS: usize = 4;

/// Ordered extraction strategies for the parts of a match page whose markup
/// is not stable. Each chain is tried front to back until one matches.
const DATE_SELECTORS: &[&str] = &[
    ".match-header-date .moment-tz-convert",
    ".match-header-date",
    "[class*='match-date']",
    ".moment-tz-convert",
];
const MAP_NAME_SELECTORS: &[&str] = &[
    ".vm-stats-game-header .map span",
    ".map span",
    "div.map span",
];
const ROW_SELECTORS: &[&str] = &[
    "table.wf-table-inset tbody tr",
    "table.wf-table tbody tr",
    "tbody tr",
];
const PLAYER_CELL_SELECTORS: &[&str] = &["td.mod-player div.text-of", "td.mod-player", "td"];
const KILL_CELL_SELECTORS: &[&str] = &[
    "td.mod-stat.mod-vlr-kills span.mod-both",
    "td.mod-stat.mod-vlr-kills",
    "td[class*='kills']",
    "td:nth-child(3)",
];
const AGENT_SELECTORS: &[&str] = &["td.mod-agents img", "td img"];

/// One map the target player appeared on within one match page.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRecord {
    pub map_name: String,
    pub agent: String,
    pub kills: u32,
    pub match_id: String,
    pub match_title: String,
    pub match_date: String,
}

#[derive(Debug, Default)]
pub struct HistoryScrape {
    /// Per-map records ordered most-recent-match-first (listing order).
    pub records: Vec<MapRecord>,
    pub links_found: usize,
    pub links_checked: usize,
}

/// Fetch the player's match-history listing and scrape up to `max_matches`
/// match pages. A match page that fails to fetch or parse contributes zero
/// records; it never aborts the batch.
pub fn collect_history(
    fetcher: &Fetcher,
    profile_url: &str,
    player: &str,
    max_matches: usize,
) -> Result<HistoryScrape, PlayerError> {
    let listing = fetcher
        .get_html(&history_url(profile_url))
        .map_err(|err| {
            warn!(player, error = %err, "match history page fetch failed");
            PlayerError::FetchFailed
        })?;
    let links = extract_match_links(&listing, fetcher.base_url());
    if links.is_empty() {
        return Err(PlayerError::NoHistory);
    }

    let mut scrape = HistoryScrape {
        links_found: links.len(),
        ..HistoryScrape::default()
    };
    for link in links.iter().take(max_matches) {
        scrape.links_checked += 1;
        let Some(match_id) = match_id_from_url(link) else {
            continue;
        };
        match fetcher.get_html(link) {
            Ok(doc) => {
                let records = parse_match_page(&doc, &match_id, player);
                debug!(player, match_id = %match_id, maps = records.len(), "parsed match page");
                scrape.records.extend(records);
            }
            Err(err) => {
                warn!(player, url = %link, error = %err, "match page fetch failed, skipping");
            }
        }
    }
    Ok(scrape)
}

/// The match-history listing lives under `/player/matches/` with the same
/// id/slug tail as the profile URL.
pub fn history_url(profile_url: &str) -> String {
    profile_url.replacen("/player/", "/player/matches/", 1)
}

/// Harvest distinct match URLs from a listing or team page: any link whose
/// first path segment is a numeric id of at least four digits, in document
/// order.
pub fn extract_match_links(doc: &Html, base_url: &str) -> Vec<String> {
    let anchor_sel = sel("a[href]");
    let mut links: Vec<String> = Vec::new();
    for anchor in doc.root_element().select(&anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let full = if href.starts_with('/') {
            format!("{base_url}{href}")
        } else if href.starts_with("http") && href.contains(host_of(base_url)) {
            href.to_string()
        } else {
            continue;
        };
        if match_id_from_url(&full).is_some() && !links.contains(&full) {
            links.push(full);
        }
    }
    links
}

/// Extract the numeric match id from a match URL (`/{id}/slug`).
pub fn match_id_from_url(url: &str) -> Option<String> {
    let path = url.strip_prefix("http").map_or(url, |_| {
        let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        after_scheme.split_once('/').map_or("", |(_, path)| path)
    });
    let first = path.trim_start_matches('/').split('/').next()?;
    let id = first.split('?').next().unwrap_or(first);
    if id.len() >= MATCH_ID_MIN_DIGITS && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

fn host_of(base_url: &str) -> &str {
    base_url
        .split_once("://")
        .map_or(base_url, |(_, rest)| rest)
        .split('/')
        .next()
        .unwrap_or(base_url)
}

/// The two team-name headers of a match page, in order.
pub fn match_teams(doc: &Html) -> Vec<String> {
    let team_sel = sel("div.match-header-link-name .wf-title-med");
    doc.root_element()
        .select(&team_sel)
        .take(2)
        .map(|el| text_of(&el))
        .collect()
}

pub fn match_title(doc: &Html) -> String {
    let teams = match_teams(doc);
    if teams.len() >= 2 {
        format!("{} vs {}", teams[0], teams[1])
    } else {
        UNKNOWN_MATCH.to_string()
    }
}

/// First parseable date-like field across the fallback locations, rendered
/// `%Y-%m-%d`; the sentinel [`UNKNOWN_DATE`] when nothing parses.
pub fn match_date(doc: &Html) -> String {
    let root = doc.root_element();
    let Some(el) = select_first(&root, DATE_SELECTORS) else {
        return UNKNOWN_DATE.to_string();
    };
    for attr in ["data-utc-ts", "data-timestamp"] {
        if let Some(raw) = el.value().attr(attr) {
            if let Some(day) = parse_day(raw) {
                return day.format("%Y-%m-%d").to_string();
            }
        }
    }
    let text = text_of(&el);
    match text.split_whitespace().next() {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => UNKNOWN_DATE.to_string(),
    }
}

/// The match date as a calendar day, when it is machine-readable. Used by
/// the upcoming-match heuristic.
pub fn match_day(doc: &Html) -> Option<NaiveDate> {
    parse_day(&match_date(doc))
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    let day_token = trimmed.split_whitespace().next()?;
    NaiveDate::parse_from_str(day_token, "%Y-%m-%d").ok()
}

/// Completed matches carry per-map stat tables; their absence marks a page
/// as not-yet-played.
pub fn has_stat_tables(doc: &Html) -> bool {
    let table_sel = sel("table.wf-table-inset, table.wf-table");
    doc.root_element().select(&table_sel).next().is_some()
}

/// Extract the target player's per-map kill records from one match page.
/// At most one row per map section belongs to the player; name matching is
/// exact-then-substring via the Name Normalizer.
pub fn parse_match_page(doc: &Html, match_id: &str, player: &str) -> Vec<MapRecord> {
    let title = match_title(doc);
    let date = match_date(doc);
    let section_sel = sel("div.vm-stats-game");
    let mut records = Vec::new();

    for section in doc.root_element().select(&section_sel) {
        // The aggregate "All Maps" section duplicates the per-map rows.
        if section.value().attr("data-game-id") == Some("all") {
            continue;
        }
        let Some(map_name) = map_name_of(&section) else {
            continue;
        };
        for row in select_all(&section, ROW_SELECTORS) {
            let Some(name) = player_name_of(&row) else {
                continue;
            };
            if !names::same_entity(&name, player) {
                continue;
            }
            records.push(MapRecord {
                map_name: map_name.clone(),
                agent: agent_of(&row),
                kills: kills_of(&row),
                match_id: match_id.to_string(),
                match_title: title.clone(),
                match_date: date.clone(),
            });
            // One row per map for the player.
            break;
        }
    }
    records
}

fn map_name_of(section: &ElementRef) -> Option<String> {
    let label = select_first(section, MAP_NAME_SELECTORS)?;
    let name = text_of(&label).replace("PICK", "");
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = name.to_lowercase();
    if name.is_empty() || lowered == "all maps" {
        None
    } else {
        Some(name)
    }
}

fn player_name_of(row: &ElementRef) -> Option<String> {
    let cell = select_first(row, PLAYER_CELL_SELECTORS)?;
    let name = cell
        .value()
        .attr("title")
        .or_else(|| cell.value().attr("data-title"))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| text_of(&cell));
    if name.is_empty() { None } else { Some(name) }
}

fn agent_of(row: &ElementRef) -> String {
    select_first(row, AGENT_SELECTORS)
        .and_then(|img| img.value().attr("alt"))
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_AGENT.to_string())
}

fn kills_of(row: &ElementRef) -> u32 {
    for css in KILL_CELL_SELECTORS {
        if let Some(cell) = select_first(row, &[css]) {
            let text = text_of(&cell);
            if let Some(kills) = text.split_whitespace().next().and_then(|t| t.parse().ok()) {
                return kills;
            }
        }
    }
    0
}

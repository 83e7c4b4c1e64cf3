use std::collections::HashMap;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agents::{self, TimespanStats};
use crate::aggregate::{self, MatchSummary, RollingAverages, MAX_MAPS_PER_MATCH};
use crate::config::Config;
use crate::error::PlayerError;
use crate::fetch::Fetcher;
use crate::history;
use crate::names;
use crate::profile::{self, ProfileRef};
use crate::slate::{self, SlateEntry};
use crate::team::{self, MatchRoster, RosterLink};

/// Upper bound on upcoming-match pages inspected for roster prefetching.
const MAX_ROSTER_MATCHES: usize = 10;

const CATCH_ALL_KEY: &str = "Other";

/// One slate line joined with the player's scraped stats, or the per-player
/// error that stopped the join. Never fatal to the batch.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRow {
    pub player: String,
    pub line: Option<f64>,
    pub odds_over: Option<String>,
    pub odds_under: Option<String>,
    pub team: Option<String>,
    pub profile_url: Option<String>,
    pub avg_last_5: Option<f64>,
    pub avg_last_10: Option<f64>,
    pub avg_last_25: Option<f64>,
    pub matches_analyzed: Option<usize>,
    pub error: Option<PlayerError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchGroup {
    pub key: String,
    pub teams: Vec<String>,
    pub players: Vec<PlayerRow>,
}

#[derive(Debug, Serialize)]
pub struct SlateAnalysis {
    pub players: Vec<PlayerRow>,
    pub groups: Vec<MatchGroup>,
}

/// Detail response for the single-player operation: the raw eligible match
/// summaries alongside the windows computed from them.
#[derive(Debug, Serialize)]
pub struct PlayerReport {
    pub player: String,
    pub team: Option<String>,
    pub team_url: Option<String>,
    pub profile_url: Option<String>,
    pub matches: Vec<MatchSummary>,
    pub averages: RollingAverages,
    pub agent_stats: Vec<TimespanStats>,
    pub matches_analyzed: usize,
    pub maps_scraped: usize,
    pub links_found: usize,
    pub error: Option<PlayerError>,
}

pub struct Analyzer<'a> {
    fetcher: &'a Fetcher,
    cfg: &'a Config,
}

#[derive(Debug, Default)]
struct ScrapedStats {
    summaries: Vec<MatchSummary>,
    averages: RollingAverages,
    maps_scraped: usize,
    links_found: usize,
    error: Option<PlayerError>,
}

impl ScrapedStats {
    fn failed(error: PlayerError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

impl<'a> Analyzer<'a> {
    pub fn new(fetcher: &'a Fetcher, cfg: &'a Config) -> Self {
        Self { fetcher, cfg }
    }

    /// Full slate operation: pull the pick'em lines, scrape stats for every
    /// player sequentially in slate order, and organize the rows by match.
    /// `match_url` is a manual roster-page override tried before team
    /// discovery.
    ///
    /// Returns Err only when the slate provider itself is unreachable;
    /// per-player failures land on the individual rows.
    pub fn analyze_slate(&self, match_url: Option<&str>) -> Result<SlateAnalysis> {
        let entries = slate::fetch_slate(self.fetcher, &self.cfg.slate_url)?;
        info!(lines = entries.len(), "analyzing pick'em slate");

        let prefetch = self.prefetch_rosters(&entries, match_url);

        let mut rows = Vec::with_capacity(entries.len());
        for entry in &entries {
            rows.push(self.row_for_entry(entry, &prefetch));
        }

        let groups = assign_groups(&entries, &rows, &prefetch.matches);
        Ok(SlateAnalysis {
            players: rows,
            groups,
        })
    }

    /// Single-player operation. Every failure mode is reported on the
    /// returned value, never raised.
    pub fn analyze_player(&self, player: &str) -> PlayerReport {
        let Some(profile) = profile::resolve_profile(self.fetcher, player) else {
            return PlayerReport {
                player: player.to_string(),
                team: None,
                team_url: None,
                profile_url: None,
                matches: Vec::new(),
                averages: RollingAverages::default(),
                agent_stats: Vec::new(),
                matches_analyzed: 0,
                maps_scraped: 0,
                links_found: 0,
                error: Some(PlayerError::NotFound),
            };
        };

        let (team_name, team_url) = match self.fetcher.get_html(&profile.url) {
            Ok(doc) => match team::current_team(&doc, self.fetcher.base_url()) {
                Some(team) => (Some(team.name), team.url),
                None => (None, None),
            },
            Err(err) => {
                warn!(player, error = %err, "profile page fetch failed");
                (None, None)
            }
        };

        let agent_stats = agents::collect_agent_stats(self.fetcher, &profile.url);
        let stats = self.scrape_stats(&profile.url, player);
        PlayerReport {
            player: player.to_string(),
            team: team_name,
            team_url,
            profile_url: Some(profile.url),
            matches_analyzed: stats.summaries.len(),
            matches: stats.summaries,
            averages: stats.averages,
            agent_stats,
            maps_scraped: stats.maps_scraped,
            links_found: stats.links_found,
            error: stats.error,
        }
    }

    /// Steps 1–3 of the slate pipeline: resolve every player's current team,
    /// find the next match each team plays, and pull player profile links
    /// plus team pairs from those match pages. Best effort throughout; any
    /// failure just leaves the fallback name-search path to do the work.
    ///
    /// A manual `match_url` short-circuits discovery: when its roster page
    /// loads, that single match supplies the links and team pair.
    fn prefetch_rosters(&self, entries: &[SlateEntry], match_url: Option<&str>) -> Prefetch {
        let mut prefetch = Prefetch::default();

        if let Some(url) = match_url {
            if let Some(roster) = team::fetch_match_roster(self.fetcher, url) {
                info!(url, "using manually provided match url");
                prefetch.adopt_roster(&roster);
                return prefetch;
            }
            warn!(url, "provided match url unusable, falling back to discovery");
        }

        let mut team_urls: Vec<String> = Vec::new();

        for entry in entries {
            let Some(profile) = profile::resolve_profile(self.fetcher, &entry.player) else {
                continue;
            };
            let doc = match self.fetcher.get_html(&profile.url) {
                Ok(doc) => doc,
                Err(err) => {
                    debug!(player = %entry.player, error = %err, "profile fetch failed in prefetch");
                    continue;
                }
            };
            prefetch
                .profiles
                .insert(names::normalize(&entry.player), profile);
            let Some(team) = team::current_team(&doc, self.fetcher.base_url()) else {
                continue;
            };
            if let Some(url) = team.url {
                if !team_urls.contains(&url) {
                    team_urls.push(url);
                }
            }
        }
        info!(teams = team_urls.len(), "resolved teams for slate players");

        let today = Utc::now().date_naive();
        let mut match_urls: Vec<String> = Vec::new();
        for team_url in &team_urls {
            if let Some(url) = team::upcoming_match_for_team(self.fetcher, team_url, today) {
                if !match_urls.contains(&url) {
                    match_urls.push(url);
                }
            }
        }

        for match_url in match_urls.iter().take(MAX_ROSTER_MATCHES) {
            let Some(roster) = team::fetch_match_roster(self.fetcher, match_url) else {
                continue;
            };
            if !roster_has_slate_player(&roster, entries) {
                continue;
            }
            debug!(url = %match_url, teams = ?roster.teams, "roster match selected");
            prefetch.adopt_roster(&roster);
        }
        prefetch
    }

    fn row_for_entry(&self, entry: &SlateEntry, prefetch: &Prefetch) -> PlayerRow {
        info!(player = %entry.player, "processing slate player");
        let link = prefetch.lookup_link(&entry.player);
        let mut team_name = link.and_then(|l| l.team.clone());

        let profile_url = link
            .map(|l| l.url.clone())
            .or_else(|| {
                prefetch
                    .profiles
                    .get(&names::normalize(&entry.player))
                    .map(|p: &ProfileRef| p.url.clone())
            })
            .or_else(|| {
                profile::resolve_profile(self.fetcher, &entry.player).map(|p| p.url)
            });
        let Some(profile_url) = profile_url else {
            warn!(player = %entry.player, "no profile found, continuing batch");
            return assemble_row(entry, None, None, ScrapedStats::failed(PlayerError::NotFound));
        };

        // The roster prefetch already knows the team for most players; only
        // hit the profile page when it does not.
        if team_name.is_none() {
            if let Ok(doc) = self.fetcher.get_html(&profile_url) {
                team_name = team::current_team(&doc, self.fetcher.base_url()).map(|t| t.name);
            }
        }

        let stats = self.scrape_stats(&profile_url, &entry.player);
        if let Some(error) = &stats.error {
            warn!(player = %entry.player, %error, "player failed, continuing batch");
        }
        assemble_row(entry, Some(profile_url), team_name, stats)
    }

    fn scrape_stats(&self, profile_url: &str, player: &str) -> ScrapedStats {
        let scrape = match history::collect_history(
            self.fetcher,
            profile_url,
            player,
            self.cfg.max_matches,
        ) {
            Ok(scrape) => scrape,
            Err(error) => return ScrapedStats::failed(error),
        };

        let summaries = aggregate::group_by_match(&scrape.records, MAX_MAPS_PER_MATCH);
        let error = summaries
            .is_empty()
            .then_some(PlayerError::InsufficientEligibleMatches);
        let averages = aggregate::rolling_averages(&summaries);
        ScrapedStats {
            summaries,
            averages,
            maps_scraped: scrape.records.len(),
            links_found: scrape.links_found,
            error,
        }
    }

}

/// Pure row assembly: one slate entry plus whatever scraping produced for it.
/// A scrape error clears the averages and the match count; provider team
/// metadata backs up a missing scraped team either way.
fn assemble_row(
    entry: &SlateEntry,
    profile_url: Option<String>,
    team: Option<String>,
    stats: ScrapedStats,
) -> PlayerRow {
    let failed = stats.error.is_some();
    PlayerRow {
        player: entry.player.clone(),
        line: entry.line,
        odds_over: entry.over_price.clone(),
        odds_under: entry.under_price.clone(),
        team: team.or_else(|| entry.team.clone()),
        profile_url,
        avg_last_5: stats.averages.last_5,
        avg_last_10: stats.averages.last_10,
        avg_last_25: stats.averages.last_25,
        matches_analyzed: (!failed).then_some(stats.summaries.len()),
        error: stats.error,
    }
}

#[derive(Debug, Clone)]
struct MatchTeams {
    teams: [String; 2],
}

#[derive(Debug, Default)]
struct Prefetch {
    /// normalized player name -> profile link found on a roster page
    links: HashMap<String, RosterLink>,
    /// normalized player name -> profile resolved during team discovery
    profiles: HashMap<String, ProfileRef>,
    /// team pairs of the upcoming matches that were found
    matches: Vec<MatchTeams>,
}

impl Prefetch {
    /// Merge one roster page in: first link wins per player, and a full team
    /// pair records the match for grouping.
    fn adopt_roster(&mut self, roster: &MatchRoster) {
        for (key, link) in &roster.players {
            self.links
                .entry(key.clone())
                .or_insert_with(|| link.clone());
        }
        if roster.teams.len() >= 2 {
            self.matches.push(MatchTeams {
                teams: [roster.teams[0].clone(), roster.teams[1].clone()],
            });
        }
    }

    /// Exact normalized lookup first, then the permissive alias scan.
    fn lookup_link(&self, player: &str) -> Option<&RosterLink> {
        let key = names::normalize(player);
        self.links
            .get(&key)
            .or_else(|| {
                self.links
                    .values()
                    .find(|link| names::same_entity_exact(&link.display_name, player))
            })
            .or_else(|| {
                self.links
                    .values()
                    .find(|link| names::same_entity(&link.display_name, player))
            })
    }
}

fn roster_has_slate_player(roster: &MatchRoster, entries: &[SlateEntry]) -> bool {
    entries.iter().any(|entry| {
        roster
            .players
            .values()
            .any(|link| names::same_entity(&link.display_name, &entry.player))
    })
}

/// Place every row in exactly one group. Priority per row: a scraped match
/// whose teams cover the row's team, then provider-side team/match metadata,
/// then the catch-all group. Rows are visited in slate order, so the output
/// is deterministic for a given input.
fn assign_groups(
    entries: &[SlateEntry],
    rows: &[PlayerRow],
    matches: &[MatchTeams],
) -> Vec<MatchGroup> {
    let mut groups: Vec<MatchGroup> = matches
        .iter()
        .map(|m| MatchGroup {
            key: format!("{} vs {}", m.teams[0], m.teams[1]),
            teams: m.teams.to_vec(),
            players: Vec::new(),
        })
        .collect();
    // Provider match labels form additional groups when scraping found none.
    let mut catch_all: Vec<PlayerRow> = Vec::new();

    for (entry, row) in entries.iter().zip(rows) {
        let team = row.team.as_deref().or(entry.team.as_deref());
        let target = groups.iter().position(|group| {
            let by_team = team
                .map(|t| group.teams.iter().any(|gt| names::same_entity(gt, t)))
                .unwrap_or(false);
            let by_label = entry
                .match_label
                .as_deref()
                .map(|label| names::same_entity(label, &group.key))
                .unwrap_or(false);
            by_team || by_label
        });
        match target {
            Some(idx) => groups[idx].players.push(row.clone()),
            None => {
                if let Some(label) = entry.match_label.as_deref() {
                    let idx = ensure_label_group(&mut groups, label);
                    groups[idx].players.push(row.clone());
                } else {
                    catch_all.push(row.clone());
                }
            }
        }
    }

    groups.retain(|group| !group.players.is_empty());
    if !catch_all.is_empty() {
        groups.push(MatchGroup {
            key: CATCH_ALL_KEY.to_string(),
            teams: Vec::new(),
            players: catch_all,
        });
    }
    groups
}

/// Index of the group for a provider match label, creating it on first use.
fn ensure_label_group(groups: &mut Vec<MatchGroup>, label: &str) -> usize {
    if let Some(idx) = groups
        .iter()
        .position(|g| names::same_entity(&g.key, label))
    {
        return idx;
    }
    let teams: Vec<String> = label
        .split(" vs ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    groups.push(MatchGroup {
        key: label.to_string(),
        teams,
        players: Vec::new(),
    });
    groups.len() - 1
}

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::fetch::Fetcher;

/// Fixed market-name suffix identifying the betting lines this pipeline
/// analyzes. The player name is whatever precedes it in the line title.
pub const MARKET_SUFFIX: &str = " Kills on Maps 1+2 O/U";

/// One betting line from the pick'em provider, filtered to the kills market.
#[derive(Debug, Clone, PartialEq)]
pub struct SlateEntry {
    pub player: String,
    pub line: Option<f64>,
    pub over_price: Option<String>,
    pub under_price: Option<String>,
    /// Provider-side team metadata, when the composite schema carries it.
    pub team: Option<String>,
    /// Provider-side match label ("Team A vs Team B"), composite schema only.
    pub match_label: Option<String>,
}

pub fn fetch_slate(fetcher: &Fetcher, url: &str) -> Result<Vec<SlateEntry>> {
    let body = fetcher.get_text(url).context("slate provider unreachable")?;
    let entries = parse_slate_json(&body)?;
    debug!(lines = entries.len(), "parsed pick'em slate");
    Ok(entries)
}

/// Parse a slate payload. Two provider schema versions are tolerated: a flat
/// array of line objects, or a composite document with separate lists for
/// lines, appearances, players, teams and games joined by shared ids.
pub fn parse_slate_json(raw: &str) -> Result<Vec<SlateEntry>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid slate json")?;
    match &root {
        Value::Array(items) => Ok(parse_lines(items, &JoinTables::default())),
        Value::Object(_) => {
            let lines = root
                .get("over_under_lines")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            let tables = JoinTables::from_root(&root);
            Ok(parse_lines(&lines, &tables))
        }
        _ => Err(anyhow::anyhow!("unexpected slate payload shape")),
    }
}

/// Lookup tables for the composite schema. Missing lists simply leave the
/// corresponding metadata absent; a line is never dropped for a broken join.
#[derive(Debug, Default)]
struct JoinTables {
    /// appearance id -> (team name, match label)
    appearances: HashMap<String, (Option<String>, Option<String>)>,
}

impl JoinTables {
    fn from_root(root: &Value) -> Self {
        let team_names: HashMap<String, String> = collect_by_id(root, "teams", |team| {
            pick_str(team, &["abbr", "name"])
        });
        let game_labels: HashMap<String, String> = collect_by_id(root, "games", |game| {
            pick_str(game, &["title", "name"])
        });

        let mut appearances = HashMap::new();
        if let Some(list) = root.get("appearances").and_then(|v| v.as_array()) {
            for appearance in list {
                let Some(id) = id_str(appearance.get("id")) else {
                    continue;
                };
                let team = id_str(appearance.get("team_id"))
                    .and_then(|tid| team_names.get(&tid).cloned());
                let label = id_str(appearance.get("match_id"))
                    .and_then(|mid| game_labels.get(&mid).cloned());
                appearances.insert(id, (team, label));
            }
        }
        Self { appearances }
    }

    fn lookup(&self, line: &Value) -> (Option<String>, Option<String>) {
        let appearance_id = line
            .get("over_under")
            .and_then(|ou| ou.get("appearance_stat"))
            .and_then(|st| st.get("appearance_id"))
            .or_else(|| line.get("appearance_id"));
        id_str(appearance_id)
            .and_then(|id| self.appearances.get(&id).cloned())
            .unwrap_or((None, None))
    }
}

fn parse_lines(items: &[Value], tables: &JoinTables) -> Vec<SlateEntry> {
    items
        .iter()
        .filter_map(|item| parse_line(item, tables))
        .collect()
}

fn parse_line(item: &Value, tables: &JoinTables) -> Option<SlateEntry> {
    let title = item
        .get("over_under")
        .and_then(|ou| ou.get("title"))
        .and_then(|t| t.as_str())?;
    if !title.contains(MARKET_SUFFIX.trim_start()) {
        return None;
    }
    let player = title.replace(MARKET_SUFFIX, "").trim().to_string();
    if player.is_empty() {
        return None;
    }

    let line = item.get("stat_value").and_then(as_f64);
    let options = item
        .get("options")
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let over_price = options.first().and_then(price_of);
    let under_price = options.get(1).and_then(price_of);

    let (team, match_label) = tables.lookup(item);

    Some(SlateEntry {
        player,
        line,
        over_price,
        under_price,
        team,
        match_label,
    })
}

fn collect_by_id(
    root: &Value,
    key: &str,
    value_of: impl Fn(&Value) -> Option<String>,
) -> HashMap<String, String> {
    let mut out = HashMap::new();
    if let Some(list) = root.get(key).and_then(|v| v.as_array()) {
        for item in list {
            if let (Some(id), Some(value)) = (id_str(item.get("id")), value_of(item)) {
                out.insert(id, value);
            }
        }
    }
    out
}

fn price_of(option: &Value) -> Option<String> {
    match option.get("american_price") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn pick_str(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        v.get(key)
            .and_then(|x| x.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Ids appear as strings or numbers depending on provider version.
fn id_str(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_slate_json;

    #[test]
    fn empty_and_null_bodies_yield_empty_slate() {
        assert!(parse_slate_json("").expect("empty").is_empty());
        assert!(parse_slate_json("null").expect("null").is_empty());
    }

    #[test]
    fn ignores_other_markets() {
        let raw = r#"[
            {"over_under": {"title": "PlayerX Headshots O/U"}, "stat_value": "9.5"},
            {"over_under": {"title": "PlayerY Kills on Maps 1+2 O/U"}, "stat_value": "31.5",
             "options": [{"american_price": "-120"}, {"american_price": "+100"}]}
        ]"#;
        let entries = parse_slate_json(raw).expect("parse");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].player, "PlayerY");
        assert_eq!(entries[0].line, Some(31.5));
        assert_eq!(entries[0].over_price.as_deref(), Some("-120"));
        assert_eq!(entries[0].under_price.as_deref(), Some("+100"));
    }

    #[test]
    fn numeric_stat_values_and_prices_parse() {
        let raw = r#"[
            {"over_under": {"title": "P Kills on Maps 1+2 O/U"}, "stat_value": 14.5,
             "options": [{"american_price": -110}]}
        ]"#;
        let entries = parse_slate_json(raw).expect("parse");
        assert_eq!(entries[0].line, Some(14.5));
        assert_eq!(entries[0].over_price.as_deref(), Some("-110"));
        assert_eq!(entries[0].under_price, None);
    }
}

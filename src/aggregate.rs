use std::collections::HashMap;

use serde::Serialize;

use crate::history::MapRecord;

/// The betting market covers kills on maps 1 and 2 only, so a match counts
/// toward averages iff exactly this many per-map records were collected.
pub const MAX_MAPS_PER_MATCH: usize = 2;

pub const WINDOWS: [usize; 3] = [5, 10, 25];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapKill {
    pub map: String,
    pub agent: String,
    pub kills: u32,
}

/// Per-match reduction of the raw map records. Only eligible summaries
/// (exactly [`MAX_MAPS_PER_MATCH`] maps, positive total) are ever surfaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub match_id: String,
    pub match_title: String,
    pub date: String,
    pub map_kills: Vec<MapKill>,
    pub total_kills: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RollingAverages {
    pub last_5: Option<f64>,
    pub last_10: Option<f64>,
    pub last_25: Option<f64>,
}

/// Group map records by owning match, preserving first-seen match order and
/// keeping at most `max_maps` records per match in insertion order (never
/// re-sorted by map number). The result contains eligible matches only.
///
/// The caller supplies records pre-ordered most-recent-match-first; the
/// grouping order, and therefore the rolling windows, inherit that order.
pub fn group_by_match(records: &[MapRecord], max_maps: usize) -> Vec<MatchSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, MatchSummary> = HashMap::new();

    for record in records {
        let bucket = buckets
            .entry(record.match_id.clone())
            .or_insert_with(|| {
                order.push(record.match_id.clone());
                MatchSummary {
                    match_id: record.match_id.clone(),
                    match_title: record.match_title.clone(),
                    date: record.match_date.clone(),
                    map_kills: Vec::new(),
                    total_kills: 0,
                }
            });
        if bucket.map_kills.len() < max_maps {
            bucket.map_kills.push(MapKill {
                map: record.map_name.clone(),
                agent: record.agent.clone(),
                kills: record.kills,
            });
            bucket.total_kills += record.kills;
        }
    }

    order
        .into_iter()
        .filter_map(|id| buckets.remove(&id))
        .filter(|summary| summary.map_kills.len() == max_maps && summary.total_kills > 0)
        .collect()
}

/// Fixed-window rolling averages over eligible matches in grouping order.
/// A window value exists only when at least that many eligible matches do.
pub fn rolling_averages(summaries: &[MatchSummary]) -> RollingAverages {
    RollingAverages {
        last_5: window_average(summaries, 5),
        last_10: window_average(summaries, 10),
        last_25: window_average(summaries, 25),
    }
}

fn window_average(summaries: &[MatchSummary], window: usize) -> Option<f64> {
    if summaries.len() < window {
        return None;
    }
    let total: u32 = summaries[..window].iter().map(|s| s.total_kills).sum();
    Some(round2(f64::from(total) / window as f64))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use crate::history::MapRecord;

    use super::{group_by_match, rolling_averages, round2, MAX_MAPS_PER_MATCH};

    fn record(match_id: &str, map: &str, kills: u32) -> MapRecord {
        MapRecord {
            map_name: map.to_string(),
            agent: "jett".to_string(),
            kills,
            match_id: match_id.to_string(),
            match_title: format!("title-{match_id}"),
            match_date: "2025-06-07".to_string(),
        }
    }

    #[test]
    fn groups_in_first_seen_order_and_caps_maps() {
        let records = vec![
            record("2001", "Ascent", 12),
            record("2001", "Bind", 8),
            record("2001", "Haven", 99), // third map is never counted
            record("1001", "Lotus", 10),
            record("1001", "Pearl", 5),
        ];
        let summaries = group_by_match(&records, MAX_MAPS_PER_MATCH);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].match_id, "2001");
        assert_eq!(summaries[0].total_kills, 20);
        assert_eq!(summaries[0].map_kills.len(), 2);
        assert_eq!(summaries[1].match_id, "1001");
        assert_eq!(summaries[1].total_kills, 15);
    }

    #[test]
    fn single_map_matches_are_excluded_entirely() {
        let records = vec![
            record("3001", "Ascent", 25),
            record("3002", "Bind", 11),
            record("3002", "Haven", 9),
        ];
        let summaries = group_by_match(&records, MAX_MAPS_PER_MATCH);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].match_id, "3002");
    }

    #[test]
    fn zero_kill_matches_are_excluded() {
        let records = vec![record("4001", "Ascent", 0), record("4001", "Bind", 0)];
        assert!(group_by_match(&records, MAX_MAPS_PER_MATCH).is_empty());
    }

    #[test]
    fn grouping_is_idempotent_over_shared_input() {
        let records = vec![
            record("5001", "Ascent", 7),
            record("5001", "Bind", 9),
            record("5002", "Haven", 13),
            record("5002", "Lotus", 6),
        ];
        let first = group_by_match(&records, MAX_MAPS_PER_MATCH);
        let second = group_by_match(&records, MAX_MAPS_PER_MATCH);
        assert_eq!(first, second);
    }

    #[test]
    fn windows_absent_below_their_size() {
        // Totals [20, 10, 5] most-recent-first: only 3 eligible matches.
        let records = vec![
            record("6001", "A", 12),
            record("6001", "B", 8),
            record("6002", "A", 4),
            record("6002", "B", 6),
            record("6003", "A", 3),
            record("6003", "B", 2),
        ];
        let summaries = group_by_match(&records, MAX_MAPS_PER_MATCH);
        let totals: Vec<u32> = summaries.iter().map(|s| s.total_kills).collect();
        assert_eq!(totals, vec![20, 10, 5]);

        let averages = rolling_averages(&summaries);
        assert_eq!(averages.last_5, None);
        assert_eq!(averages.last_10, None);
        assert_eq!(averages.last_25, None);
    }

    #[test]
    fn window_average_uses_first_w_totals() {
        let mut records = Vec::new();
        for i in 0..6u32 {
            records.push(record(&format!("70{i:02}"), "A", 10 + i));
            records.push(record(&format!("70{i:02}"), "B", 5));
        }
        let summaries = group_by_match(&records, MAX_MAPS_PER_MATCH);
        assert_eq!(summaries.len(), 6);
        // Totals most-recent-first: [15, 16, 17, 18, 19, 20].
        let averages = rolling_averages(&summaries);
        assert_eq!(averages.last_5, Some(round2(17.0)));
        assert_eq!(averages.last_10, None);
    }

    #[test]
    fn rounding_is_two_decimal_places() {
        assert_eq!(round2(10.0 / 3.0), 3.33);
        assert_eq!(round2(12.346), 12.35);
        assert_eq!(round2(14.0), 14.0);
    }
}
